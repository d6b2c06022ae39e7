//! Optional observability helpers for request lifecycles and the renewal gate.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `resilient_http.op` with the `op` (request or
//!   renewal) and `stage` (call site) fields, plus events when a renewal is triggered or an attempt
//!   is retried.
//! - Enable `metrics` to increment the `resilient_http_operation_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// One logical request driven by the client.
	Request,
	/// One pass through the renewal gate.
	Renewal,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Request => "request",
			Operation::Renewal => "renewal",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// A failed attempt is about to be repeated.
	Retry,
	/// A caller joined an in-flight renewal.
	Coalesced,
	/// Successful completion.
	Success,
	/// Failure reported back to the caller.
	Failure,
	/// The renewal lost the race against its timeout.
	Timeout,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Retry => "retry",
			Outcome::Coalesced => "coalesced",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
			Outcome::Timeout => "timeout",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
