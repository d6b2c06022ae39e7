//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::Mutex;
use serde_json::Value;
use url::Url;
// self
use resilient_http::{
	client::Client,
	error::{BoxError, TransportError},
	headers::DefaultHeaderBuilder,
	http::{RequestOptions, ResponseRecord, Transport, TransportFuture},
	renewal::{CredentialRenewer, RenewFuture, RenewalGate, TokenSecret},
};

pub const BASE_URL: &str = "https://api.example.com/";

/// One scripted transport step.
#[derive(Clone, Debug)]
pub enum Step {
	/// Return a response with this status and payload.
	Respond(u16, Option<Value>),
	/// Fail at the network level.
	Fail,
}

/// Transport replaying a script; the final step repeats once the script runs out.
#[derive(Debug)]
pub struct ScriptedTransport {
	script: Mutex<VecDeque<Step>>,
	requests: Mutex<Vec<RequestOptions>>,
}
impl ScriptedTransport {
	pub fn new(script: impl IntoIterator<Item = Step>) -> Self {
		let script: VecDeque<Step> = script.into_iter().collect();

		assert!(!script.is_empty(), "Transport script must contain at least one step.");

		Self { script: Mutex::new(script), requests: Mutex::default() }
	}

	pub fn always(status: u16, data: Option<Value>) -> Self {
		Self::new([Step::Respond(status, data)])
	}

	pub fn calls(&self) -> usize {
		self.requests.lock().len()
	}

	pub fn requests(&self) -> Vec<RequestOptions> {
		self.requests.lock().clone()
	}

	fn next_step(&self) -> Step {
		let mut script = self.script.lock();

		if script.len() > 1 {
			script.pop_front().expect("Script length was checked.")
		} else {
			script.front().cloned().expect("Script always keeps its final step.")
		}
	}
}
impl Transport for ScriptedTransport {
	fn perform(&self, options: RequestOptions) -> TransportFuture<'_> {
		self.requests.lock().push(options);

		let step = self.next_step();

		Box::pin(async move {
			match step {
				Step::Respond(status, data) => Ok(ResponseRecord::new(status, data)),
				Step::Fail => Err(TransportError::from(std::io::Error::new(
					std::io::ErrorKind::ConnectionRefused,
					"connection refused",
				))),
			}
		})
	}
}

/// How a [`StubRenewer`] settles.
#[derive(Clone, Copy, Debug)]
pub enum Renewal {
	/// Produce `token-<n>` where `n` counts calls.
	Succeed,
	/// Fail with a `denied` I/O error.
	Fail,
	/// Never settle.
	Hang,
}

/// Renewer counting its invocations, optionally sleeping before it settles.
#[derive(Debug)]
pub struct StubRenewer {
	calls: AtomicUsize,
	delay: Option<StdDuration>,
	behavior: Renewal,
}
impl StubRenewer {
	pub fn new(behavior: Renewal) -> Self {
		Self { calls: AtomicUsize::new(0), delay: None, behavior }
	}

	pub fn delayed(behavior: Renewal, delay: StdDuration) -> Self {
		Self { delay: Some(delay), ..Self::new(behavior) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl CredentialRenewer for StubRenewer {
	fn renew(&self) -> RenewFuture<'_> {
		let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
		let delay = self.delay;
		let behavior = self.behavior;

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			match behavior {
				Renewal::Succeed => Ok(TokenSecret::new(format!("token-{n}"))),
				Renewal::Fail => Err(BoxError::from(std::io::Error::other("denied"))),
				Renewal::Hang => std::future::pending().await,
			}
		})
	}
}

/// Builds a client resolving paths against [`BASE_URL`].
pub fn build_client(
	transport: Arc<ScriptedTransport>,
	renewer: Arc<StubRenewer>,
) -> (Client<ScriptedTransport>, Arc<RenewalGate>) {
	let gate = Arc::new(RenewalGate::new(renewer));
	let headers = DefaultHeaderBuilder::new()
		.with_base_url(Url::parse(BASE_URL).expect("Base URL fixture should parse."));
	let client =
		Client::with_transport(transport, gate.clone()).with_header_builder(Arc::new(headers));

	(client, gate)
}
