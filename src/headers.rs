//! Request option construction.
//!
//! Every attempt gets freshly built [`RequestOptions`] so a credential renewed between attempts
//! is picked up by the next one. [`DefaultHeaderBuilder`] always sends the client identifier, the
//! current time, and a bearer authorization derived from the cached credential; JSON posts also
//! declare their content type.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{HttpMethod, RequestOptions},
	renewal::TokenSecret,
};

/// Header carrying the client identifier.
pub const CLIENT_IDENTIFIER_HEADER: &str = "X-Requested-With";
/// Header carrying the ISO-8601 time the attempt was built.
pub const LOCAL_TIME_HEADER: &str = "X-Local-Time";
/// Authorization header name.
pub const AUTHORIZATION_HEADER: &str = "Authorization";
/// Content type header name.
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
/// Client identifier sent when none is configured.
pub const DEFAULT_CLIENT_IDENTIFIER: &str = "XMLHttpRequest";

/// Data sent with a request; its shape must match the [`HttpMethod`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Payload {
	/// No payload.
	#[default]
	None,
	/// Raw query string (without the leading `?`) for `GET` requests.
	Query(String),
	/// JSON body for `POST` requests.
	Json(Value),
}
impl Payload {
	/// Returns a stable label for error messages.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Payload::None => "empty",
			Payload::Query(_) => "query",
			Payload::Json(_) => "json",
		}
	}
}
impl From<Value> for Payload {
	fn from(value: Value) -> Self {
		Self::Json(value)
	}
}

/// Builds the [`RequestOptions`] for one attempt.
pub trait HeaderBuilder
where
	Self: Send + Sync,
{
	/// Resolves `url`, attaches headers, and places `payload` according to `method`.
	fn build(
		&self,
		method: HttpMethod,
		url: &str,
		payload: &Payload,
		credential: Option<&TokenSecret>,
	) -> Result<RequestOptions, ConfigError>;
}

/// Header builder applying the crate's standard header policy.
#[derive(Clone, Debug)]
pub struct DefaultHeaderBuilder {
	base_url: Option<Url>,
	client_identifier: String,
}
impl DefaultHeaderBuilder {
	/// Creates a builder that expects absolute URLs.
	pub fn new() -> Self {
		Self { base_url: None, client_identifier: DEFAULT_CLIENT_IDENTIFIER.into() }
	}

	/// Joins relative request URLs onto `base_url`.
	pub fn with_base_url(mut self, base_url: Url) -> Self {
		self.base_url = Some(base_url);

		self
	}

	/// Overrides the client identifier header value.
	pub fn with_client_identifier(mut self, identifier: impl Into<String>) -> Self {
		self.client_identifier = identifier.into();

		self
	}

	fn resolve(&self, raw: &str) -> Result<Url, ConfigError> {
		let parsed = match &self.base_url {
			Some(base) => base.join(raw),
			None => Url::parse(raw),
		};

		parsed.map_err(|source| ConfigError::InvalidUrl { url: raw.to_owned(), source })
	}
}
impl Default for DefaultHeaderBuilder {
	fn default() -> Self {
		Self::new()
	}
}
impl HeaderBuilder for DefaultHeaderBuilder {
	fn build(
		&self,
		method: HttpMethod,
		url: &str,
		payload: &Payload,
		credential: Option<&TokenSecret>,
	) -> Result<RequestOptions, ConfigError> {
		let mut url = self.resolve(url)?;
		let mut headers = BTreeMap::new();

		headers.insert(CLIENT_IDENTIFIER_HEADER.to_owned(), self.client_identifier.clone());
		headers.insert(LOCAL_TIME_HEADER.to_owned(), OffsetDateTime::now_utc().format(&Rfc3339)?);

		if let Some(token) = credential.filter(|token| !token.is_empty()) {
			headers.insert(AUTHORIZATION_HEADER.to_owned(), format!("Bearer {}", token.expose()));
		}

		let body = match (method, payload) {
			(HttpMethod::Get, Payload::None) => None,
			(HttpMethod::Get, Payload::Query(query)) => {
				append_query(&mut url, query);

				None
			},
			(HttpMethod::PostJson, Payload::None) => {
				headers.insert(CONTENT_TYPE_HEADER.to_owned(), "application/json".to_owned());

				None
			},
			(HttpMethod::PostJson, Payload::Json(value)) => {
				headers.insert(CONTENT_TYPE_HEADER.to_owned(), "application/json".to_owned());

				Some(value.clone())
			},
			(method, payload) =>
				return Err(ConfigError::PayloadMismatch {
					method: method.as_str(),
					payload: payload.as_str(),
				}),
		};

		Ok(RequestOptions { url, method, headers, body })
	}
}

fn append_query(url: &mut Url, query: &str) {
	let query = query.trim_start_matches('?');

	if query.is_empty() {
		return;
	}

	let combined = match url.query() {
		Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
		_ => query.to_owned(),
	};

	url.set_query(Some(&combined));
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn builder() -> DefaultHeaderBuilder {
		DefaultHeaderBuilder::new()
			.with_base_url(Url::parse("https://api.example.com/v1/").expect("Base URL should parse."))
	}

	#[test]
	fn get_appends_query_and_standard_headers() {
		let token = TokenSecret::new("abc");
		let options = builder()
			.build(HttpMethod::Get, "items", &Payload::Query("id=1".into()), Some(&token))
			.expect("GET options should build.");

		assert_eq!(options.url.as_str(), "https://api.example.com/v1/items?id=1");
		assert_eq!(options.method, HttpMethod::Get);
		assert_eq!(options.header(CLIENT_IDENTIFIER_HEADER), Some("XMLHttpRequest"));
		assert_eq!(options.header(AUTHORIZATION_HEADER), Some("Bearer abc"));
		assert!(options.header(CONTENT_TYPE_HEADER).is_none());
		assert!(options.body.is_none());

		let stamp = options.header(LOCAL_TIME_HEADER).expect("Time header should be present.");

		OffsetDateTime::parse(stamp, &Rfc3339).expect("Time header should be ISO-8601.");
	}

	#[test]
	fn get_merges_existing_query() {
		let options = builder()
			.build(HttpMethod::Get, "items?page=2", &Payload::Query("?id=1".into()), None)
			.expect("GET options should build.");

		assert_eq!(options.url.query(), Some("page=2&id=1"));
	}

	#[test]
	fn post_sets_content_type_and_body() {
		let body = serde_json::json!({ "name": "x" });
		let options = builder()
			.with_client_identifier("svc-router")
			.build(HttpMethod::PostJson, "/items", &Payload::Json(body.clone()), None)
			.expect("POST options should build.");

		assert_eq!(options.url.as_str(), "https://api.example.com/items");
		assert_eq!(options.header(CONTENT_TYPE_HEADER), Some("application/json"));
		assert_eq!(options.header(CLIENT_IDENTIFIER_HEADER), Some("svc-router"));
		assert!(options.header(AUTHORIZATION_HEADER).is_none());
		assert_eq!(options.body, Some(body));
	}

	#[test]
	fn mismatched_payload_is_rejected() {
		let err = builder()
			.build(HttpMethod::Get, "items", &Payload::Json(Value::Null), None)
			.expect_err("GET must not carry a JSON body.");

		assert!(matches!(err, ConfigError::PayloadMismatch { method: "GET", payload: "json" }));
	}

	#[test]
	fn relative_url_without_base_is_rejected() {
		let err = DefaultHeaderBuilder::new()
			.build(HttpMethod::Get, "/items", &Payload::None, None)
			.expect_err("Relative URLs need a base.");

		assert!(matches!(err, ConfigError::InvalidUrl { .. }));
	}
}
