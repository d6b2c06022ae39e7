//! Error types shared by the request lifecycle, the renewal gate, and transports.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error produced by external collaborators (transports, renewers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared handle to an original error so one failure can be fanned out to many observers.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by the typed client helpers.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Every attempt failed; carries the error recorded on the final attempt.
	#[error("Request failed after {attempts} attempt(s).")]
	Exhausted {
		/// Number of attempts performed, including the initial one.
		attempts: u32,
		/// Error recorded on the final attempt.
		#[source]
		last: RequestError,
	},
	/// The final attempt succeeded without recording a response.
	#[error("Final attempt did not record a response.")]
	MissingResponse,
	/// Response payload could not be decoded into the requested type.
	#[error("Response payload could not be decoded.")]
	Decode {
		/// Structured decoding failure naming the offending JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Configuration and request construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Request URL cannot be parsed or joined onto the base URL.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// Raw URL supplied by the caller.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Payload shape does not fit the requested HTTP method.
	#[error("The {method} method does not accept a {payload} payload.")]
	PayloadMismatch {
		/// Method label.
		method: &'static str,
		/// Payload label.
		payload: &'static str,
	},
	/// Time header could not be rendered.
	#[error("Request timestamp could not be formatted.")]
	Timestamp(#[from] time::error::Format),
	/// Request body could not be serialized into JSON.
	#[error("Request body could not be serialized.")]
	Body(#[from] serde_json::Error),
	/// Configuration document could not be parsed.
	#[error("Configuration could not be parsed.")]
	Parse(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// Configuration document continues after its top-level JSON value.
	#[error("Configuration has trailing input after the JSON document.")]
	TrailingInput {
		/// Parser failure located at the trailing input.
		#[source]
		source: serde_json::Error,
	},
}

/// Transport-level failures (network, IO). Non-2xx statuses are not transport failures.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Outcome of a failed renewal, delivered identically to the driver and every waiter.
#[derive(Clone, Debug, ThisError)]
pub enum RenewalError {
	/// The renewal did not settle before the gate's timeout elapsed.
	#[error("Credential renewal timed out after {after}.")]
	Timeout {
		/// Timeout that elapsed.
		after: Duration,
	},
	/// The renewal collaborator reported a failure.
	#[error("Credential renewal failed.")]
	Failed {
		/// Original error raised by the collaborator.
		#[source]
		source: SharedError,
	},
	/// The driving caller was dropped before the renewal settled.
	#[error("Credential renewal was abandoned before it settled.")]
	Abandoned,
}
impl RenewalError {
	/// Wraps a collaborator failure, keeping the original error as the source.
	pub fn failed(src: impl Into<BoxError>) -> Self {
		Self::Failed { source: Arc::from(src.into()) }
	}

	/// Returns `true` for [`RenewalError::Timeout`].
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}

/// Closed set of error kinds a request attempt can be classified into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
	/// Catch-all: transport exceptions, renewal failures, and non-401 non-2xx statuses.
	Generic,
	/// Network unreachable. Emitted only by custom classifiers.
	ConnectionFailure,
	/// Host reachable but the service is not. Emitted only by custom classifiers.
	ServiceUnavailable,
	/// Credential rejected by the server (HTTP 401).
	AuthExpired,
}
impl ErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::Generic => "generic",
			ErrorKind::ConnectionFailure => "connection_failure",
			ErrorKind::ServiceUnavailable => "service_unavailable",
			ErrorKind::AuthExpired => "auth_expired",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Typed error attached to a request attempt. Immutable once created.
#[derive(Clone, Debug, ThisError)]
#[error(
	"Request attempt failed with kind `{kind}`{}.",
	.code.map(|c| format!(" (status {c})")).unwrap_or_default()
)]
pub struct RequestError {
	/// Classified kind.
	pub kind: ErrorKind,
	/// HTTP status code, when the failure came from a response.
	pub code: Option<u16>,
	/// Human-readable detail.
	pub message: Option<String>,
	/// Original error, when the failure came from a transport or renewal error.
	#[source]
	pub cause: Option<SharedError>,
}
impl RequestError {
	/// Creates an error of the given kind with no detail.
	pub fn new(kind: ErrorKind) -> Self {
		Self { kind, code: None, message: None, cause: None }
	}

	/// Shorthand for a [`ErrorKind::Generic`] error.
	pub fn generic() -> Self {
		Self::new(ErrorKind::Generic)
	}

	/// Attaches the HTTP status code.
	pub fn with_code(mut self, code: u16) -> Self {
		self.code = Some(code);

		self
	}

	/// Attaches a human-readable message.
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());

		self
	}

	/// Attaches the original error.
	pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
		self.cause = Some(Arc::from(cause.into()));

		self
	}

	/// Returns `true` when the server rejected the credential.
	pub fn is_auth_expired(&self) -> bool {
		self.kind == ErrorKind::AuthExpired
	}
}
