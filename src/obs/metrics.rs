// self
use crate::{
	auth::RealmId,
	obs::{self, FlowKind, FlowOutcome},
};

/// Name of the pipeline counter.
pub const FLOW_COUNTER: &str = "tokengate_flow_total";

/// Bumps [`FLOW_COUNTER`] for one stage event of `realm` through the global recorder.
pub fn record_flow_outcome(kind: FlowKind, realm: Option<RealmId>, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		FLOW_COUNTER,
		"flow" => kind.as_str(),
		"realm" => obs::realm_label(realm),
		"outcome" => outcome.as_str()
	)
	.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, obs::realm_label(realm), outcome);
}
