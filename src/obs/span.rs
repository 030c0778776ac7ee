// crates.io
use tracing::{Instrument, Span, field, instrument::Instrumented, span::Entered};
// self
use crate::{
	_prelude::*,
	obs::{self, FlowKind, FlowOutcome},
};

/// One observed run of a bridge flow.
///
/// [`begin`](Self::begin) opens a `credential_bridge.flow` span and counts the attempt;
/// [`finish`](Self::finish) stamps the `outcome` field on that span and counts the result.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	kind: FlowKind,
	span: Span,
}
impl FlowSpan {
	/// Opens the span for `kind` at `stage` and records the attempt.
	pub fn begin(kind: FlowKind, stage: &'static str) -> Self {
		let span = tracing::info_span!(
			"credential_bridge.flow",
			flow = kind.as_str(),
			stage,
			outcome = field::Empty,
		);

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		Self { kind, span }
	}

	/// Flow this span observes.
	pub fn kind(&self) -> FlowKind {
		self.kind
	}

	/// Enters the span for a synchronous section.
	pub fn enter(&self) -> Entered<'_> {
		self.span.enter()
	}

	/// Runs `fut` inside the span without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}

	/// Records the final outcome and returns it.
	pub fn finish(&self, success: bool) -> FlowOutcome {
		let outcome = FlowOutcome::from_success(success);

		self.span.record("outcome", outcome.as_str());
		obs::record_flow_outcome(self.kind, outcome);

		outcome
	}
}
