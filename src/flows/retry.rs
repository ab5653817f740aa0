//! Retry Orchestrator: decides how a failed request recovers, then drives the resubmission.
//!
//! Every request moves through `Fresh → Retried → (resolved | rejected)`. The one-shot
//! [`RetryMarker`] lives in the request extensions, so a request is resubmitted at most once
//! no matter how it fails the second time.

// self
use crate::{
	_prelude::*,
	auth::{Realm, RealmRegistry},
	flows::{AuthClient, tagging},
	http::{self, ApiTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store,
};

/// Extension inserted into a request once it has been resubmitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryMarker;

/// Retry lifecycle of a single logical request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryState {
	/// Never resubmitted.
	Fresh,
	/// Already resubmitted once.
	Retried,
}
impl RetryState {
	/// Reads the state from the request extensions.
	pub fn of(request: &HttpRequest) -> Self {
		if request.extensions().get::<RetryMarker>().is_some() { Self::Retried } else { Self::Fresh }
	}

	/// Moves `request` to [`RetryState::Retried`].
	pub fn mark_retried(request: &mut HttpRequest) {
		request.extensions_mut().insert(RetryMarker);
	}
}

/// Recovery chosen for a failed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryDecision {
	/// Surface the failure unchanged.
	Reject,
	/// Public URL rejected a stale token: drop the default realm's tokens and resubmit without
	/// `Authorization`.
	RetryAnonymous,
	/// Refresh the realm's access token and resubmit with it.
	Refresh(Arc<Realm>),
}

/// Classifies `error`, raised by `request`, into a [`RetryDecision`].
///
/// Only 401/403 responses are recoverable, and only for requests aimed at `origin` (or relative
/// to it). Public URLs get one anonymous retry. Everything else needs a fresh request routed to a
/// realm and not aimed at that realm's refresh endpoint.
pub fn decide(
	error: &Error,
	request: &HttpRequest,
	registry: &RealmRegistry,
	origin: Option<&Url>,
) -> RetryDecision {
	if !error.is_auth_failure() {
		return RetryDecision::Reject;
	}

	let Some(url) = http::local_target(request.uri(), origin) else {
		return RetryDecision::Reject;
	};
	let state = RetryState::of(request);

	if registry.is_public(url) {
		return match state {
			RetryState::Fresh => RetryDecision::RetryAnonymous,
			RetryState::Retried => RetryDecision::Reject,
		};
	}
	if state == RetryState::Retried {
		return RetryDecision::Reject;
	}

	match registry.resolve(url) {
		Some(realm) if !realm.is_refresh_endpoint(url) => RetryDecision::Refresh(Arc::clone(realm)),
		_ => RetryDecision::Reject,
	}
}

impl<T> AuthClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Sends `request` through the pipeline: tag, send, and recover from one auth failure.
	///
	/// Non-success responses surface as [`Error::Status`]. When a retry also fails, its own
	/// error is returned and nothing else is attempted. Requests that already carry a
	/// [`RetryMarker`] are sent once and never resubmitted.
	pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
		const KIND: FlowKind = FlowKind::Retry;

		let span = FlowSpan::new(KIND, "execute");

		span.instrument(async move {
			// Only fresh requests can be resubmitted, so only they keep a copy.
			let snapshot = (RetryState::of(&request) == RetryState::Fresh).then(|| request.clone());
			let error = match self.dispatch(request).await {
				Ok(response) => return Ok(response),
				Err(e) => e,
			};
			let Some(snapshot) = snapshot else {
				return Err(error);
			};
			let (mut resubmission, realm) =
				match decide(&error, &snapshot, &self.registry, self.transport.origin()) {
					RetryDecision::Reject => return Err(error),
					RetryDecision::RetryAnonymous => {
						obs::record_flow_outcome(KIND, None, FlowOutcome::Attempt);
						self.drop_stale_public_tokens();

						(tagging::strip_bearer(snapshot), None)
					},
					RetryDecision::Refresh(realm) => {
						let id = realm.id;

						obs::record_flow_outcome(KIND, Some(id), FlowOutcome::Attempt);

						match self.refresh(id).await {
							Ok(token) => (tagging::apply_bearer(snapshot, &token), Some(id)),
							Err(e) => {
								obs::record_flow_outcome(KIND, Some(id), FlowOutcome::Failure);

								return Err(e);
							},
						}
					},
				};

			RetryState::mark_retried(&mut resubmission);

			let outcome = self.dispatch(resubmission).await;

			obs::record_flow_outcome(KIND, realm, FlowOutcome::of(&outcome));

			outcome
		})
		.await
	}

	/// Tags and sends one request; non-success statuses become [`Error::Status`].
	async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse> {
		let origin = self.transport.origin();
		let request = tagging::tag(request, &self.registry, self.store.as_ref(), origin)?;
		let response = self.transport.send(request).await?;

		if response.status().is_success() { Ok(response) } else { Err(Error::status(response)) }
	}

	fn drop_stale_public_tokens(&self) {
		let realm = self.registry.default_realm();

		if let Err(_e) = store::clear_realm(self.store.as_ref(), realm) {
			#[cfg(feature = "tracing")]
			tracing::warn!(realm = %realm.id, "Failed to drop stale tokens: {_e}.");
		}
	}
}
