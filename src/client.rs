//! Request lifecycle orchestration.
//!
//! [`Client::execute`] drives one logical request to completion. Each iteration builds fresh
//! options, sends them, classifies the outcome, and, when the server rejected the credential,
//! resets it and waits on the shared [`RenewalGate`] before looping. Every error kind is retried
//! the same way until the [`RetryPolicy`] bound is reached; only the recovery step tells
//! [`ErrorKind::AuthExpired`] apart. `execute` itself never fails: the full attempt history is
//! returned as an [`Execution`], which callers turn into a tagged result or, for the legacy
//! behavior, into whatever payload the final attempt carried.

// self
use crate::{
	_prelude::*,
	classify::{DefaultClassifier, OutcomeClassifier},
	config::{ClientConfig, RetryPolicy},
	error::{ConfigError, ErrorKind, RequestError},
	headers::{DefaultHeaderBuilder, HeaderBuilder, Payload},
	http::{HttpMethod, RequestOptions, ResponseRecord, Transport},
	obs::{self, OpSpan, Operation, Outcome},
	renewal::{CredentialRenewer, RenewalGate},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type DefaultClient = Client<ReqwestTransport>;

/// Retrying request driver sharing one [`RenewalGate`] across all of its requests.
pub struct Client<T>
where
	T: ?Sized + Transport,
{
	/// Transport performing every attempt.
	pub transport: Arc<T>,
	/// Single-flight renewal gate holding the cached credential.
	pub renewal: Arc<RenewalGate>,
	/// Builder producing each attempt's request options.
	pub headers: Arc<dyn HeaderBuilder>,
	/// Classifier mapping outcomes to typed errors.
	pub classifier: Arc<dyn OutcomeClassifier>,
	/// Retry bound and delay schedule.
	pub retry: RetryPolicy,
}
impl<T> Client<T>
where
	T: ?Sized + Transport,
{
	/// Creates a client with the default header builder, classifier, and retry policy.
	pub fn with_transport(transport: impl Into<Arc<T>>, renewal: Arc<RenewalGate>) -> Self {
		Self {
			transport: transport.into(),
			renewal,
			headers: Arc::new(DefaultHeaderBuilder::default()),
			classifier: Arc::new(DefaultClassifier),
			retry: RetryPolicy::default(),
		}
	}

	/// Creates a client, and its renewal gate, from `config`.
	pub fn from_config(
		config: &ClientConfig,
		transport: impl Into<Arc<T>>,
		renewer: Arc<dyn CredentialRenewer>,
	) -> Self {
		let renewal = Arc::new(RenewalGate::from_config(renewer, &config.renewal));
		let mut headers = DefaultHeaderBuilder::new();

		if let Some(base_url) = &config.base_url {
			headers = headers.with_base_url(base_url.clone());
		}
		if let Some(identifier) = &config.client_identifier {
			headers = headers.with_client_identifier(identifier.clone());
		}

		Self::with_transport(transport, renewal)
			.with_header_builder(Arc::new(headers))
			.with_retry_policy(config.retry.clone())
	}

	/// Replaces the header builder.
	pub fn with_header_builder(mut self, headers: Arc<dyn HeaderBuilder>) -> Self {
		self.headers = headers;

		self
	}

	/// Replaces the outcome classifier.
	pub fn with_classifier(mut self, classifier: Arc<dyn OutcomeClassifier>) -> Self {
		self.classifier = classifier;

		self
	}

	/// Replaces the retry policy.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Sends a `GET` with `query` as the query string and decodes the final payload.
	///
	/// Fails with [`Error::Exhausted`] when the final attempt still carries an error.
	pub async fn get<D>(&self, url: &str, query: impl Into<String>) -> Result<D>
	where
		D: DeserializeOwned,
	{
		self.execute(HttpMethod::Get, url, Payload::Query(query.into())).await.decode()
	}

	/// Sends a `POST` with `body` encoded as JSON and decodes the final payload.
	///
	/// Fails with [`Error::Exhausted`] when the final attempt still carries an error.
	pub async fn post_json<D, B>(&self, url: &str, body: &B) -> Result<D>
	where
		D: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		let body = serde_json::to_value(body).map_err(ConfigError::from)?;

		self.execute(HttpMethod::PostJson, url, Payload::Json(body)).await.decode()
	}

	/// Drives one logical request through as many attempts as the retry policy allows.
	pub async fn execute(&self, method: HttpMethod, url: &str, payload: Payload) -> Execution {
		let span = OpSpan::new(Operation::Request, "execute");

		obs::record_outcome(Operation::Request, Outcome::Attempt);

		let execution = span.instrument(self.run(method, url, &payload)).await;

		if execution.is_success() {
			obs::record_outcome(Operation::Request, Outcome::Success);
		} else {
			obs::record_outcome(Operation::Request, Outcome::Failure);
		}

		execution
	}

	async fn run(&self, method: HttpMethod, url: &str, payload: &Payload) -> Execution {
		let mut history = Vec::new();
		let mut retry = 0_u32;

		loop {
			let mut attempt = self.attempt(method, url, payload).await;

			attempt.retry_count = retry;
			retry = retry.saturating_add(1);

			self.recover(&mut attempt).await;

			let Some(error) = &attempt.error else {
				return Execution { history, last: attempt };
			};

			if !self.retry.allows_retry(attempt.retry_count) {
				return Execution { history, last: attempt };
			}

			obs::attempt_retried(attempt.retry_count, error.kind, error.code);
			obs::record_outcome(Operation::Request, Outcome::Retry);

			let delay = self.retry.delay_after(attempt.retry_count);

			history.push(attempt);

			if delay.is_positive() {
				tokio::time::sleep(delay.unsigned_abs()).await;
			}
		}
	}

	async fn attempt(&self, method: HttpMethod, url: &str, payload: &Payload) -> RequestAttempt {
		let credential = self.renewal.token();
		let options = match self.headers.build(method, url, payload, credential.as_ref()) {
			Ok(options) => options,
			Err(e) => return RequestAttempt::failed(None, self.classifier.classify_build_error(e)),
		};

		match self.transport.perform(options.clone()).await {
			Ok(response) => {
				let error = self.classifier.classify_response(&response);

				RequestAttempt {
					options: Some(options),
					response: Some(response),
					retry_count: 0,
					error,
					renewed: false,
				}
			},
			Err(e) =>
				RequestAttempt::failed(Some(options), self.classifier.classify_transport_error(e)),
		}
	}

	async fn recover(&self, attempt: &mut RequestAttempt) {
		if !attempt.error.as_ref().is_some_and(RequestError::is_auth_expired) {
			return;
		}

		obs::renewal_triggered(attempt.retry_count);

		attempt.renewed = true;

		self.renewal.reset_credential();

		if let Err(e) = self.renewal.ensure_fresh().await {
			attempt.error = Some(RequestError::generic().with_message(e.to_string()).with_cause(e));
		}
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestTransport> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(renewal: Arc<RenewalGate>) -> Self {
		Self::with_transport(ReqwestTransport::default(), renewal)
	}
}
impl<T> Clone for Client<T>
where
	T: ?Sized + Transport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			renewal: self.renewal.clone(),
			headers: self.headers.clone(),
			classifier: self.classifier.clone(),
			retry: self.retry.clone(),
		}
	}
}
impl<T> Debug for Client<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("renewal", &self.renewal)
			.field("retry", &self.retry)
			.finish()
	}
}

/// Stage an attempt stopped at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttemptStage {
	/// Request options could not be built.
	Building,
	/// The transport failed before a response arrived.
	Sent,
	/// A response arrived and was classified as an error.
	Classified,
	/// The credential was rejected and the attempt went through the renewal gate.
	Recovering,
	/// The attempt succeeded.
	Done,
}

/// One send/classify cycle of a logical request.
#[derive(Clone, Debug)]
pub struct RequestAttempt {
	/// Options sent; `None` when they could not be built.
	pub options: Option<RequestOptions>,
	/// Response received, if the transport produced one.
	pub response: Option<ResponseRecord>,
	/// Zero-based position of this attempt within the request.
	pub retry_count: u32,
	/// Error recorded for this attempt; `None` means success.
	pub error: Option<RequestError>,
	/// Whether this attempt sent the request through the renewal gate.
	pub renewed: bool,
}
impl RequestAttempt {
	fn failed(options: Option<RequestOptions>, error: RequestError) -> Self {
		Self { options, response: None, retry_count: 0, error: Some(error), renewed: false }
	}

	/// Returns `true` when no error was recorded.
	pub fn is_success(&self) -> bool {
		self.error.is_none()
	}

	/// Returns the stage this attempt stopped at.
	pub fn stage(&self) -> AttemptStage {
		match (&self.error, &self.options, &self.response) {
			(None, ..) => AttemptStage::Done,
			(Some(_), None, _) => AttemptStage::Building,
			_ if self.renewed => AttemptStage::Recovering,
			(Some(_), Some(_), None) => AttemptStage::Sent,
			(Some(_), Some(_), Some(_)) => AttemptStage::Classified,
		}
	}

	/// Returns the kind of the recorded error, if any.
	pub fn error_kind(&self) -> Option<ErrorKind> {
		self.error.as_ref().map(|error| error.kind)
	}
}

/// Attempt history of one [`Client::execute`] call.
#[derive(Clone, Debug)]
pub struct Execution {
	history: Vec<RequestAttempt>,
	last: RequestAttempt,
}
impl Execution {
	/// Returns the final attempt, whose payload is the logical result.
	pub fn last(&self) -> &RequestAttempt {
		&self.last
	}

	/// Iterates over every attempt in the order they were made.
	pub fn attempts(&self) -> impl Iterator<Item = &RequestAttempt> {
		self.history.iter().chain(std::iter::once(&self.last))
	}

	/// Returns the number of attempts made.
	pub fn attempt_count(&self) -> u32 {
		self.last.retry_count.saturating_add(1)
	}

	/// Returns the number of attempts that went through the renewal gate.
	pub fn renewals(&self) -> usize {
		self.attempts().filter(|attempt| attempt.renewed).count()
	}

	/// Returns `true` when the final attempt succeeded.
	pub fn is_success(&self) -> bool {
		self.last.is_success()
	}

	/// Returns the error recorded on the final attempt.
	pub fn error(&self) -> Option<&RequestError> {
		self.last.error.as_ref()
	}

	/// Returns the payload carried by the final attempt, whatever its outcome.
	pub fn payload(&self) -> Option<&Value> {
		self.last.response.as_ref().and_then(|response| response.data.as_ref())
	}

	/// Converts the history into a tagged result: the final response on success, otherwise
	/// [`Error::Exhausted`] with the final attempt's error.
	pub fn into_result(self) -> Result<ResponseRecord> {
		let attempts = self.attempt_count();

		match self.last.error {
			Some(last) => Err(Error::Exhausted { attempts, last }),
			None => self.last.response.ok_or(Error::MissingResponse),
		}
	}

	/// Decodes the final payload of a successful execution. A missing body decodes as `null`.
	pub fn decode<D>(self) -> Result<D>
	where
		D: DeserializeOwned,
	{
		let data = self.into_result()?.data.unwrap_or(Value::Null);

		serde_path_to_error::deserialize(data).map_err(|source| Error::Decode { source })
	}

	/// Returns the final attempt's payload regardless of outcome, or `None` when it is absent or
	/// does not decode into `D`.
	///
	/// Callers cannot tell an empty success from exhausted retries through this shim; inspect
	/// [`Execution::error`] or use [`Execution::into_result`] when that matters.
	pub fn into_payload<D>(self) -> Option<D>
	where
		D: DeserializeOwned,
	{
		let data = self.last.response?.data?;

		serde_json::from_value(data).ok()
	}
}
