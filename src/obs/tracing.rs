// self
use crate::{_prelude::*, error::ErrorKind, obs::Operation};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by the client and the renewal gate.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(op: Operation, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("resilient_http.op", op = op.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (op, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a warning when an authorization failure sends a request through the renewal gate.
pub fn renewal_triggered(retry_count: u32) {
	#[cfg(feature = "tracing")]
	tracing::warn!(retry_count, "credential rejected, starting renewal");
	#[cfg(not(feature = "tracing"))]
	let _ = retry_count;
}

/// Emits a debug event before a failed attempt is repeated.
pub fn attempt_retried(retry_count: u32, kind: ErrorKind, code: Option<u16>) {
	#[cfg(feature = "tracing")]
	tracing::debug!(retry_count, kind = kind.as_str(), code, "attempt failed, retrying");
	#[cfg(not(feature = "tracing"))]
	let _ = (retry_count, kind, code);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn events_noop_without_subscriber() {
		renewal_triggered(0);
		attempt_retried(1, ErrorKind::Generic, Some(500));
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = OpSpan::new(Operation::Request, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
