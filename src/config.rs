//! Client configuration: retry bound, optional backoff, renewal timeout, and header defaults.
//!
//! Every field has a default matching the crate's reference behavior (five retries, no delay
//! between attempts, a 60 second renewal timeout), so an empty JSON object is a valid
//! configuration. Durations are expressed in whole seconds (`*_secs`) when deserialized.

// crates.io
use rand::Rng;
// self
use crate::{_prelude::*, error::ConfigError};

/// Top-level configuration consumed by [`Client::from_config`](crate::client::Client::from_config).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
	/// Base URL relative request paths are joined onto.
	pub base_url: Option<Url>,
	/// Value of the client-identifier header.
	pub client_identifier: Option<String>,
	/// Retry policy.
	pub retry: RetryPolicy,
	/// Renewal gate settings.
	pub renewal: RenewalConfig,
}
impl ClientConfig {
	/// Parses a JSON configuration document, naming the offending field on failure.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let config = serde_path_to_error::deserialize(&mut de)?;

		de.end().map_err(|source| ConfigError::TrailingInput { source })?;

		Ok(config)
	}

	/// Sets the base URL.
	pub fn with_base_url(mut self, base_url: Url) -> Self {
		self.base_url = Some(base_url);

		self
	}

	/// Overrides the retry policy.
	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Overrides the renewal settings.
	pub fn with_renewal(mut self, renewal: RenewalConfig) -> Self {
		self.renewal = renewal;

		self
	}
}

/// Bounds how many times a failed request is repeated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Retries after the initial attempt; `5` means up to six attempts.
	pub max_retries: u32,
	/// Delay schedule between attempts; `None` retries immediately.
	pub backoff: Option<Backoff>,
}
impl RetryPolicy {
	/// Retry bound applied when none is configured.
	pub const DEFAULT_MAX_RETRIES: u32 = 5;

	/// Overrides the retry bound.
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;

		self
	}

	/// Enables a delay schedule between attempts.
	pub fn with_backoff(mut self, backoff: Backoff) -> Self {
		self.backoff = Some(backoff);

		self
	}

	/// Returns `true` when another attempt is allowed after the attempt numbered `retry_count`.
	pub fn allows_retry(&self, retry_count: u32) -> bool {
		retry_count < self.max_retries
	}

	/// Delay to wait before the attempt following `retry_count`.
	pub fn delay_after(&self, retry_count: u32) -> Duration {
		self.backoff.as_ref().map(|backoff| backoff.delay(retry_count)).unwrap_or(Duration::ZERO)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { max_retries: Self::DEFAULT_MAX_RETRIES, backoff: None }
	}
}

/// Capped exponential delay schedule with optional full jitter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backoff {
	/// Delay before the first retry.
	#[serde(rename = "initial_secs", with = "seconds")]
	pub initial: Duration,
	/// Upper bound for any single delay.
	#[serde(rename = "max_secs", with = "seconds")]
	pub max: Duration,
	/// Picks a uniform delay in `[0, computed]` instead of the computed delay itself.
	pub jitter: bool,
}
impl Backoff {
	/// Creates a schedule doubling from `initial` up to `max`, without jitter.
	pub fn exponential(initial: Duration, max: Duration) -> Self {
		Self { initial: clamp_non_negative(initial), max: clamp_non_negative(max), jitter: false }
	}

	/// Enables full jitter.
	pub fn with_jitter(mut self) -> Self {
		self.jitter = true;

		self
	}

	/// Computes the delay following the attempt numbered `retry_count`.
	pub fn delay(&self, retry_count: u32) -> Duration {
		let factor = 2_i32.saturating_pow(retry_count.min(30));
		let computed = self.initial.saturating_mul(factor).min(self.max);

		if !self.jitter || computed <= Duration::ZERO {
			return computed;
		}

		let millis = computed.whole_milliseconds().clamp(0, i64::MAX as i128) as i64;

		Duration::milliseconds(rand::rng().random_range(0..=millis))
	}
}
impl Default for Backoff {
	fn default() -> Self {
		Self::exponential(Duration::seconds(1), Duration::seconds(30))
	}
}

/// Settings for the renewal gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewalConfig {
	/// Maximum time the driver waits for the renewal collaborator.
	#[serde(rename = "timeout_secs", with = "seconds")]
	pub timeout: Duration,
}
impl RenewalConfig {
	/// Overrides the renewal timeout. Negative values clamp to zero.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = clamp_non_negative(timeout);

		self
	}
}
impl Default for RenewalConfig {
	fn default() -> Self {
		Self { timeout: Duration::seconds(60) }
	}
}

fn clamp_non_negative(value: Duration) -> Duration {
	if value.is_negative() { Duration::ZERO } else { value }
}

/// Whole-second wire format. Sub-second parts round to the nearest second on the way out and
/// negative durations serialize as `0`, so a serialized config always reads back.
mod seconds {
	// self
	use super::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		let rounded = value.checked_add(Duration::milliseconds(500)).unwrap_or(Duration::MAX);

		serializer.serialize_u32(rounded.whole_seconds().clamp(0, u32::MAX.into()) as u32)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let secs = u32::deserialize(deserializer)?;

		Ok(Duration::seconds(secs.into()))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn empty_document_yields_reference_defaults() {
		let config = ClientConfig::from_json_str("{}").expect("Empty config should parse.");

		assert_eq!(config.retry.max_retries, 5);
		assert!(config.retry.backoff.is_none());
		assert_eq!(config.renewal.timeout, Duration::seconds(60));
		assert!(config.base_url.is_none());
	}

	#[test]
	fn parses_nested_fields() {
		let config = ClientConfig::from_json_str(
			r#"{
				"base_url": "https://api.example.com/v1/",
				"client_identifier": "svc-router",
				"retry": { "max_retries": 2, "backoff": { "initial_secs": 2, "max_secs": 10 } },
				"renewal": { "timeout_secs": 15 }
			}"#,
		)
		.expect("Config should parse.");

		assert_eq!(config.base_url.as_ref().map(Url::as_str), Some("https://api.example.com/v1/"));
		assert_eq!(config.client_identifier.as_deref(), Some("svc-router"));
		assert_eq!(config.retry.max_retries, 2);
		assert_eq!(
			config.retry.backoff,
			Some(Backoff::exponential(Duration::seconds(2), Duration::seconds(10)))
		);
		assert_eq!(config.renewal.timeout, Duration::seconds(15));
	}

	#[test]
	fn parse_error_names_the_field() {
		let err = ClientConfig::from_json_str(r#"{ "retry": { "max_retries": "many" } }"#)
			.expect_err("A string retry bound should be rejected.");

		match err {
			ConfigError::Parse(inner) => assert_eq!(inner.path().to_string(), "retry.max_retries"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn sub_second_durations_round_to_whole_seconds() {
		let config = ClientConfig::default()
			.with_renewal(RenewalConfig::default().with_timeout(Duration::milliseconds(1500)));
		let raw = serde_json::to_string(&config).expect("Config should serialize.");

		assert!(raw.contains("\"timeout_secs\":2"), "{raw}");

		let reread = ClientConfig::from_json_str(&raw).expect("Serialized config should parse.");

		assert_eq!(reread.renewal.timeout, Duration::seconds(2));

		let short = RenewalConfig::default().with_timeout(Duration::milliseconds(400));
		let raw = serde_json::to_string(&short).expect("Renewal config should serialize.");

		assert_eq!(raw, r#"{"timeout_secs":0}"#);
	}

	#[test]
	fn trailing_input_is_rejected() {
		let err = ClientConfig::from_json_str("{} trailing")
			.expect_err("Input after the JSON document should be rejected.");

		assert!(matches!(err, ConfigError::TrailingInput { .. }));
		assert!(ClientConfig::from_json_str("{ }\n").is_ok());
	}

	#[test]
	fn retry_policy_bounds_attempts() {
		let policy = RetryPolicy::default();

		assert!(policy.allows_retry(4));
		assert!(!policy.allows_retry(5));
		assert_eq!(policy.delay_after(3), Duration::ZERO);
	}

	#[test]
	fn backoff_doubles_and_caps() {
		let backoff = Backoff::exponential(Duration::seconds(1), Duration::seconds(5));

		assert_eq!(backoff.delay(0), Duration::seconds(1));
		assert_eq!(backoff.delay(1), Duration::seconds(2));
		assert_eq!(backoff.delay(2), Duration::seconds(4));
		assert_eq!(backoff.delay(3), Duration::seconds(5));
		assert_eq!(backoff.delay(40), Duration::seconds(5));
	}

	#[test]
	fn jittered_backoff_stays_within_bounds() {
		let backoff = Backoff::exponential(Duration::seconds(1), Duration::seconds(8)).with_jitter();

		for retry in 0..6 {
			let delay = backoff.delay(retry);

			assert!(delay >= Duration::ZERO);
			assert!(delay <= Duration::seconds(8));
		}
	}
}
