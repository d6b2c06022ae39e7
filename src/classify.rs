//! Mapping of transport outcomes onto [`ErrorKind`]s.
//!
//! [`DefaultClassifier`] implements the reference policy: 2xx is success, 401 means the
//! credential expired, every other status and every transport failure is [`ErrorKind::Generic`].
//! [`ErrorKind::ConnectionFailure`] and [`ErrorKind::ServiceUnavailable`] are reserved for custom
//! classifiers that understand their transport's failure modes.

// self
use crate::{
	error::{ConfigError, ErrorKind, RequestError, TransportError},
	http::ResponseRecord,
};

/// Status code that marks an expired or rejected credential.
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// Strategy turning attempt outcomes into typed errors.
pub trait OutcomeClassifier
where
	Self: Send + Sync,
{
	/// Classifies a response; `None` means the attempt succeeded.
	fn classify_response(&self, response: &ResponseRecord) -> Option<RequestError> {
		if response.is_success() {
			return None;
		}

		let kind = if response.status == STATUS_UNAUTHORIZED {
			ErrorKind::AuthExpired
		} else {
			ErrorKind::Generic
		};

		Some(RequestError::new(kind).with_code(response.status))
	}

	/// Classifies a network-level failure reported by the transport.
	fn classify_transport_error(&self, error: TransportError) -> RequestError {
		RequestError::generic().with_message(error.to_string()).with_cause(error)
	}

	/// Classifies a failure to build the attempt's request options.
	fn classify_build_error(&self, error: ConfigError) -> RequestError {
		RequestError::generic().with_message(error.to_string()).with_cause(error)
	}
}

/// Classifier applying the reference policy unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultClassifier;
impl OutcomeClassifier for DefaultClassifier {}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn success_statuses_carry_no_error() {
		let classifier = DefaultClassifier;

		assert!(classifier.classify_response(&ResponseRecord::new(200, None)).is_none());
		assert!(classifier.classify_response(&ResponseRecord::new(204, None)).is_none());
		assert!(classifier.classify_response(&ResponseRecord::new(299, None)).is_none());
	}

	#[test]
	fn unauthorized_maps_to_auth_expired() {
		let err = DefaultClassifier
			.classify_response(&ResponseRecord::new(401, None))
			.expect("401 should be classified as an error.");

		assert_eq!(err.kind, ErrorKind::AuthExpired);
		assert_eq!(err.code, Some(401));
	}

	#[test]
	fn other_failures_map_to_generic() {
		for status in [199, 300, 403, 404, 500, 503] {
			let err = DefaultClassifier
				.classify_response(&ResponseRecord::new(status, None))
				.expect("Non-2xx statuses should be classified as errors.");

			assert_eq!(err.kind, ErrorKind::Generic, "status {status}");
			assert_eq!(err.code, Some(status));
		}
	}

	#[test]
	fn transport_errors_keep_their_cause() {
		let err = DefaultClassifier
			.classify_transport_error(TransportError::from(std::io::Error::other("refused")));

		assert_eq!(err.kind, ErrorKind::Generic);
		assert!(err.code.is_none());
		assert!(err.cause.is_some());
	}

	#[test]
	fn custom_classifier_can_signal_service_unavailable() {
		struct GatewayAware;
		impl OutcomeClassifier for GatewayAware {
			fn classify_response(&self, response: &ResponseRecord) -> Option<RequestError> {
				match response.status {
					502..=504 => Some(
						RequestError::new(ErrorKind::ServiceUnavailable).with_code(response.status),
					),
					_ => DefaultClassifier.classify_response(response),
				}
			}
		}

		let err = GatewayAware
			.classify_response(&ResponseRecord::new(503, None))
			.expect("503 should be classified as an error.");

		assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
		assert!(GatewayAware.classify_response(&ResponseRecord::new(200, None)).is_none());
	}
}
