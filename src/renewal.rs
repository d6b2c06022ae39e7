//! Single-flight credential renewal.
//!
//! [`RenewalGate`] owns the cached credential and guarantees that, however many callers detect an
//! expired credential at the same time, exactly one renewal runs. The first caller becomes the
//! driver and races the [`CredentialRenewer`] against the gate's timeout; everyone arriving while
//! it runs is parked in a FIFO queue and receives the driver's outcome verbatim. The `renewing`
//! flag and the queue are only touched under one lock acquisition, and the flag is released on
//! every path, including when the driving future is dropped.

mod metrics;
mod secret;

pub use metrics::RenewalMetrics;
pub use secret::TokenSecret;

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	config::RenewalConfig,
	error::{BoxError, RenewalError},
	obs::{self, OpSpan, Operation, Outcome},
};

/// Boxed future returned by [`CredentialRenewer::renew`].
pub type RenewFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenSecret, BoxError>> + 'a + Send>>;

type RenewalResult = Result<bool, RenewalError>;

/// Identity-provider hook that obtains a fresh credential.
///
/// The gate treats the call as opaque: it is invoked at most once per renewal, raced against the
/// timeout, and dropped (cancelled) if the timeout wins.
pub trait CredentialRenewer
where
	Self: Send + Sync,
{
	/// Obtains a new credential value.
	fn renew(&self) -> RenewFuture<'_>;
}

/// Adapts an async closure into a [`CredentialRenewer`].
#[derive(Clone)]
pub struct RenewWith<F>(pub F);
impl<F, Fut, E> CredentialRenewer for RenewWith<F>
where
	F: 'static + Send + Sync + Fn() -> Fut,
	Fut: 'static + Send + Future<Output = Result<TokenSecret, E>>,
	E: 'static + Into<BoxError>,
{
	fn renew(&self) -> RenewFuture<'_> {
		let fut = (self.0)();

		Box::pin(async move { fut.await.map_err(Into::into) })
	}
}
impl<F> Debug for RenewWith<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RenewWith(..)")
	}
}

#[derive(Default)]
struct RenewalState {
	token: Option<TokenSecret>,
	renewing: bool,
	waiters: VecDeque<oneshot::Sender<RenewalResult>>,
}

enum Role {
	Cached(bool),
	Waiter(oneshot::Receiver<RenewalResult>),
	Driver,
}

/// Single-flight gate around credential renewal, shared by every request of one client.
pub struct RenewalGate {
	renewer: Arc<dyn CredentialRenewer>,
	timeout: Duration,
	state: Mutex<RenewalState>,
	metrics: Arc<RenewalMetrics>,
}
impl RenewalGate {
	/// Renewal timeout applied when none is configured.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(60);

	/// Creates a gate with no cached credential and the default timeout.
	pub fn new(renewer: Arc<dyn CredentialRenewer>) -> Self {
		Self {
			renewer,
			timeout: Self::DEFAULT_TIMEOUT,
			state: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Creates a gate using the timeout from `config`.
	pub fn from_config(renewer: Arc<dyn CredentialRenewer>, config: &RenewalConfig) -> Self {
		Self::new(renewer).with_timeout(config.timeout)
	}

	/// Overrides the renewal timeout. Negative values clamp to zero.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = if timeout.is_negative() { Duration::ZERO } else { timeout };

		self
	}

	/// Seeds the cache with a credential obtained outside the gate (e.g. at login).
	pub fn with_credential(self, token: impl Into<TokenSecret>) -> Self {
		self.state.lock().token = Some(token.into());

		self
	}

	/// Returns the configured renewal timeout.
	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Returns the cached credential, if any.
	pub fn token(&self) -> Option<TokenSecret> {
		self.state.lock().token.clone()
	}

	/// Returns `true` while a renewal is executing.
	pub fn is_renewing(&self) -> bool {
		self.state.lock().renewing
	}

	/// Returns the number of callers parked behind the in-flight renewal.
	pub fn waiting(&self) -> usize {
		self.state.lock().waiters.len()
	}

	/// Returns the gate's activity counters.
	pub fn metrics(&self) -> &Arc<RenewalMetrics> {
		&self.metrics
	}

	/// Clears the cached credential so the next [`ensure_fresh`](Self::ensure_fresh) renews.
	///
	/// Does not cancel a renewal that is already running.
	pub fn reset_credential(&self) {
		self.state.lock().token = None;
	}

	/// Makes sure a renewal has produced a credential, starting or joining one when needed.
	///
	/// With a non-empty credential cached, returns the current `renewing` flag without renewing.
	/// Otherwise the caller either joins the in-flight renewal or drives a new one; in both cases
	/// it observes the single outcome of that renewal: `Ok(true)` on success, or the shared
	/// [`RenewalError`] on failure or timeout.
	pub async fn ensure_fresh(&self) -> Result<bool, RenewalError> {
		let role = {
			let mut state = self.state.lock();

			if state.token.as_ref().is_some_and(|token| !token.is_empty()) {
				Role::Cached(state.renewing)
			} else if state.renewing {
				let (tx, rx) = oneshot::channel();

				state.waiters.push_back(tx);

				Role::Waiter(rx)
			} else {
				state.renewing = true;

				Role::Driver
			}
		};

		match role {
			Role::Cached(renewing) => Ok(renewing),
			Role::Waiter(rx) => {
				self.metrics.record_coalesced();
				obs::record_outcome(Operation::Renewal, Outcome::Coalesced);

				rx.await.unwrap_or(Err(RenewalError::Abandoned))
			},
			Role::Driver => {
				let span = OpSpan::new(Operation::Renewal, "ensure_fresh");

				span.instrument(self.drive()).await
			},
		}
	}

	async fn drive(&self) -> RenewalResult {
		let release = DriverGuard { gate: self, settled: false };

		self.metrics.record_attempt();
		obs::record_outcome(Operation::Renewal, Outcome::Attempt);

		let outcome =
			match tokio::time::timeout(self.timeout.unsigned_abs(), self.renewer.renew()).await {
				Ok(Ok(token)) => Ok(token),
				Ok(Err(e)) => Err(RenewalError::failed(e)),
				Err(_) => {
					self.metrics.record_timeout();
					obs::record_outcome(Operation::Renewal, Outcome::Timeout);

					Err(RenewalError::Timeout { after: self.timeout })
				},
			};

		match &outcome {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_outcome(Operation::Renewal, Outcome::Success);
			},
			Err(_) => {
				self.metrics.record_failure();
				obs::record_outcome(Operation::Renewal, Outcome::Failure);
			},
		}

		release.settle(outcome)
	}

	fn settle(&self, outcome: Result<TokenSecret, RenewalError>) -> RenewalResult {
		let mut state = self.state.lock();
		let result = outcome.map(|token| {
			state.token = Some(token);

			true
		});

		while let Some(waiter) = state.waiters.pop_front() {
			// A dropped receiver only means that waiter stopped listening.
			let _ = waiter.send(result.clone());
		}

		state.renewing = false;

		result
	}
}
impl Debug for RenewalGate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("RenewalGate")
			.field("timeout", &self.timeout)
			.field("token_set", &state.token.is_some())
			.field("renewing", &state.renewing)
			.field("waiting", &state.waiters.len())
			.finish()
	}
}

/// Releases the `renewing` flag even if the driving future is dropped mid-renewal.
struct DriverGuard<'a> {
	gate: &'a RenewalGate,
	settled: bool,
}
impl DriverGuard<'_> {
	fn settle(mut self, outcome: Result<TokenSecret, RenewalError>) -> RenewalResult {
		self.settled = true;

		self.gate.settle(outcome)
	}
}
impl Drop for DriverGuard<'_> {
	fn drop(&mut self) {
		if !self.settled {
			let _ = self.gate.settle(Err(RenewalError::Abandoned));
		}
	}
}
