//! Optional observability for the tag → refresh → retry pipeline.
//!
//! Every event is keyed by the flow stage and the realm it ran for, so a user-realm refresh storm
//! can be told apart from an admin-realm one.
//!
//! # Feature Flags
//!
//! - `tracing` opens a `tokengate.flow` span per stage with `flow`, `stage`, and `realm` fields.
//! - `metrics` increments `tokengate_flow_total{flow, realm, outcome}`.
//!
//! Without either feature the helpers compile to no-ops.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::{_prelude::*, auth::RealmId};

/// Label used when an event is not bound to any realm (anonymous public retries).
pub const UNROUTED_REALM: &str = "none";

/// Pipeline stage an event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Bearer attachment on an outbound request.
	Tag,
	/// Coordinated realm token refresh.
	Refresh,
	/// Resubmission of a request that failed authentication.
	Retry,
}
impl FlowKind {
	/// Stable label for span fields and metric labels.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Tag => "tag",
			Self::Refresh => "refresh",
			Self::Retry => "retry",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How a stage ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// The stage started (a refresh call or a resubmission was issued).
	Attempt,
	/// The stage produced a token or a successful response.
	Success,
	/// The stage failed and the error reached the caller.
	Failure,
}
impl FlowOutcome {
	/// Stable label for span fields and metric labels.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Attempt => "attempt",
			Self::Success => "success",
			Self::Failure => "failure",
		}
	}

	/// Maps a finished result onto [`FlowOutcome::Success`] or [`FlowOutcome::Failure`].
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { Self::Success } else { Self::Failure }
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Realm label shared by spans and counters; [`UNROUTED_REALM`] when there is none.
pub fn realm_label(realm: Option<RealmId>) -> &'static str {
	realm.map_or(UNROUTED_REALM, RealmId::as_str)
}
