// self
use crate::obs::{Operation, Outcome};

/// Counter incremented once per recorded outcome.
pub const OPERATION_COUNTER: &str = "resilient_http_operation_total";

/// Label pairs attached to [`OPERATION_COUNTER`].
pub fn outcome_labels(op: Operation, outcome: Outcome) -> [(&'static str, &'static str); 2] {
	[("op", op.as_str()), ("outcome", outcome.as_str())]
}

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_outcome(op: Operation, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		let labels = outcome_labels(op, outcome);

		metrics::counter!(OPERATION_COUNTER, &labels).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	let _ = (op, outcome);
}
