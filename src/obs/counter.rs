// self
use crate::{
	auth::DenialReason,
	obs::{FlowKind, FlowOutcome},
};

/// Counts one flow attempt or result as `credential_bridge_flow_total{flow, outcome}`.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	increment(
		"credential_bridge_flow_total",
		[("flow", kind.as_str()), ("outcome", outcome.as_str())],
	);
}

/// Counts one refused token request as `credential_bridge_token_denied_total{reason}`.
pub fn record_token_denial(reason: DenialReason) {
	increment("credential_bridge_token_denied_total", [("reason", reason.as_str())]);
}

#[cfg(feature = "metrics")]
fn increment<const N: usize>(name: &'static str, labels: [(&'static str, &'static str); N]) {
	let labels = labels
		.into_iter()
		.map(|(key, value)| metrics::Label::new(key, value))
		.collect::<Vec<_>>();

	metrics::counter!(name, labels).increment(1);
}

// Without a recorder the label tuples are built and dropped.
#[cfg(not(feature = "metrics"))]
fn increment<const N: usize>(_: &'static str, _: [(&'static str, &'static str); N]) {}
