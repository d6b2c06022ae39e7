//! Transport primitives: the request/response records exchanged with the network layer and the
//! [`Transport`] trait that performs the actual I/O.
//!
//! The client never talks to a socket itself. Every attempt builds a fresh [`RequestOptions`],
//! hands it to a [`Transport`], and receives a [`ResponseRecord`]. Transports report
//! network-level failures (DNS, refused connections, broken streams) as [`TransportError`] and
//! return every HTTP status, 4xx and 5xx included, as a normal response.

// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`Transport::perform`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ResponseRecord, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing one request attempt.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// request of a client behind an `Arc`, and the futures they return must be `Send` so request
/// lifecycles can hop executors.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Performs the request described by `options`.
	fn perform(&self, options: RequestOptions) -> TransportFuture<'_>;
}

/// HTTP verbs supported by the client, each tied to how its payload travels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
	/// `GET` with the payload encoded as the query string.
	Get,
	/// `POST` with the payload encoded as a JSON body.
	PostJson,
}
impl HttpMethod {
	/// Returns the wire verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::PostJson => "POST",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fully resolved description of one request attempt. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOptions {
	/// Absolute request URL, query string included.
	pub url: Url,
	/// HTTP verb.
	pub method: HttpMethod,
	/// Request headers; order is irrelevant.
	pub headers: BTreeMap<String, String>,
	/// JSON body, for methods that carry one.
	pub body: Option<Value>,
}
impl RequestOptions {
	/// Returns the value of `name`, if present.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).map(String::as_str)
	}
}

/// Status and payload returned by a [`Transport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseRecord {
	/// HTTP status code.
	pub status: u16,
	/// Decoded payload; `None` when the response had no body.
	pub data: Option<Value>,
}
impl ResponseRecord {
	/// Creates a record with the given status and payload.
	pub fn new(status: u16, data: Option<Value>) -> Self {
		Self { status, data }
	}

	/// Returns `true` for statuses in `200..=299`.
	pub fn is_success(&self) -> bool {
		(200..=299).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] implementing [`Transport`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn perform(&self, options: RequestOptions) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match options.method {
				HttpMethod::Get => reqwest::Method::GET,
				HttpMethod::PostJson => reqwest::Method::POST,
			};
			let mut request = client.request(method, options.url);

			for (name, value) in &options.headers {
				request = request.header(name, value);
			}
			if let Some(body) = &options.body {
				request = request.json(body);
			}

			let response = request.send().await?;
			let status = response.status().as_u16();
			let bytes = response.bytes().await?;

			Ok(ResponseRecord { status, data: decode_body(&bytes) })
		})
	}
}

/// Decodes a response body: JSON when possible, a JSON string otherwise, nothing when empty.
#[cfg_attr(not(feature = "reqwest"), allow(dead_code))]
pub(crate) fn decode_body(bytes: &[u8]) -> Option<Value> {
	if bytes.iter().all(u8::is_ascii_whitespace) {
		return None;
	}

	serde_json::from_slice(bytes)
		.ok()
		.or_else(|| Some(Value::String(String::from_utf8_lossy(bytes).into_owned())))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn success_range_is_inclusive() {
		assert!(ResponseRecord::new(200, None).is_success());
		assert!(ResponseRecord::new(299, None).is_success());
		assert!(!ResponseRecord::new(199, None).is_success());
		assert!(!ResponseRecord::new(300, None).is_success());
		assert!(!ResponseRecord::new(401, None).is_success());
	}

	#[test]
	fn body_decoding_prefers_json() {
		assert_eq!(decode_body(b""), None);
		assert_eq!(decode_body(b"  \n"), None);
		assert_eq!(decode_body(b"[1,2,3]"), Some(serde_json::json!([1, 2, 3])));
		assert_eq!(decode_body(b"plain text"), Some(Value::String("plain text".into())));
	}

	#[test]
	fn method_labels_match_wire_verbs() {
		assert_eq!(HttpMethod::Get.to_string(), "GET");
		assert_eq!(HttpMethod::PostJson.as_str(), "POST");
	}
}
