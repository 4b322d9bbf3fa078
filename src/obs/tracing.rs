// crates.io
use tracing::{Span, instrument::Instrumented, span::EnteredSpan};
// self
use crate::{_prelude::*, obs::Stage};

/// A span builder used by pipeline stages.
#[derive(Clone, Debug)]
pub struct StageSpan {
	span: Span,
}
impl StageSpan {
	/// Creates a new span tagged with the provided stage + operation.
	pub fn new(stage: Stage, op: &'static str) -> Self {
		Self { span: tracing::info_span!("strava_backup.stage", stage = stage.as_str(), op) }
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> StageSpanGuard {
		StageSpanGuard { _guard: self.span.entered() }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		use tracing::Instrument;

		fut.instrument(self.span.clone())
	}
}

/// RAII guard returned by [`StageSpan::entered`].
pub struct StageSpanGuard {
	_guard: EnteredSpan,
}
impl Debug for StageSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("StageSpanGuard(..)")
	}
}
