//! Refresh Coordinator: one refresh network call per realm, shared by every concurrent caller.
//!
//! The first caller to observe a stale token becomes the leader: it marks the realm as
//! refreshing, exchanges the stored refresh token at the realm's refresh endpoint through the
//! raw transport, persists the result, and broadcasts it. Callers that arrive while the leader
//! is in flight are queued and receive the leader's outcome, success or failure, in FIFO order.
//! The in-flight flag and the queue live under one lock and are only mutated together.

mod metrics;
pub mod response;

pub use metrics::RefreshMetrics;

// std
use std::{collections::VecDeque, mem};
// crates.io
use oauth2::http::{Method, Request, header::CONTENT_TYPE};
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{Realm, TokenSecret},
	error::{RefreshError, RefreshFailure},
	http::ApiTransport,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{self, TokenStore},
};

type RefreshOutcome = Result<TokenSecret, RefreshError>;

#[derive(Debug, Default)]
struct RefreshState {
	in_flight: bool,
	waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Per-realm refresh singleton.
#[derive(Debug)]
pub struct RefreshCoordinator {
	realm: Arc<Realm>,
	state: Mutex<RefreshState>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator for `realm`.
	pub fn new(realm: Arc<Realm>) -> Self {
		Self { realm, state: Default::default(), metrics: Default::default() }
	}

	/// Realm this coordinator refreshes.
	pub fn realm(&self) -> &Realm {
		&self.realm
	}

	/// Returns `true` while a refresh network call is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().in_flight
	}

	/// Number of callers waiting on the in-flight refresh.
	pub fn queued(&self) -> usize {
		self.state.lock().waiters.len()
	}

	/// Counters for this realm.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns a fresh access token, starting a refresh or joining the one in flight.
	///
	/// On failure both stored secrets of the realm are removed and every queued caller receives
	/// the same error. Dropping the leader's future before it settles rejects queued callers with
	/// [`RefreshError::Abandoned`] and leaves storage untouched.
	pub async fn refresh<T>(&self, transport: &T, store: &dyn TokenStore) -> RefreshOutcome
	where
		T: ?Sized + ApiTransport,
	{
		const KIND: FlowKind = FlowKind::Refresh;

		let waiter = {
			let mut state = self.state.lock();

			if state.in_flight {
				let (tx, rx) = oneshot::channel();

				state.waiters.push_back(tx);

				Some(rx)
			} else {
				state.in_flight = true;

				None
			}
		};

		if let Some(rx) = waiter {
			self.metrics.record_joined();

			return rx.await.unwrap_or(Err(RefreshError::Abandoned { realm: self.realm.id }));
		}

		let release = InFlightRelease { coordinator: self, settled: false };
		let realm = Some(self.realm.id);
		let span = FlowSpan::with_realm(KIND, "refresh", realm);

		obs::record_flow_outcome(KIND, realm, FlowOutcome::Attempt);
		self.metrics.record_attempt();

		let outcome = span.instrument(self.exchange(transport, store)).await;

		match &outcome {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_flow_outcome(KIND, realm, FlowOutcome::Success);
			},
			Err(_) => {
				self.metrics.record_failure();
				obs::record_flow_outcome(KIND, realm, FlowOutcome::Failure);

				if let Err(_e) = store::clear_realm(store, &self.realm) {
					#[cfg(feature = "tracing")]
					tracing::warn!(realm = %self.realm.id, "Failed to clear tokens after refresh failure: {_e}.");
				}
			},
		}

		release.settle(&outcome);

		outcome
	}

	async fn exchange<T>(&self, transport: &T, store: &dyn TokenStore) -> RefreshOutcome
	where
		T: ?Sized + ApiTransport,
	{
		let realm = self.realm.id;
		let failed = |reason: RefreshFailure| RefreshError::Failed { realm, reason };
		let refresh_token = store::load_refresh_token(store, &self.realm)
			.map_err(|e| failed(RefreshFailure::Storage(e)))?
			.ok_or(RefreshError::MissingRefreshToken { realm })?;
		let body = serde_json::json!({ "refreshToken": refresh_token.expose() }).to_string();
		let request = Request::builder()
			.method(Method::POST)
			.uri(self.realm.refresh_path.as_str())
			.header(CONTENT_TYPE, "application/json")
			.body(body.into_bytes())
			.map_err(|e| failed(crate::error::TransportError::from(e).into()))?;
		let response = transport.send(request).await.map_err(|e| failed(e.into()))?;

		if !response.status().is_success() {
			return Err(failed(RefreshFailure::Status { status: response.status() }));
		}

		let pair = response::extract_token_pair(response.body()).map_err(failed)?;

		store::persist_pair(store, &self.realm, &pair)
			.map_err(|e| failed(RefreshFailure::Storage(e)))?;

		Ok(pair.access_token)
	}

	fn release(&self, outcome: &RefreshOutcome) {
		let waiters = {
			let mut state = self.state.lock();

			state.in_flight = false;

			mem::take(&mut state.waiters)
		};

		for waiter in waiters {
			let _ = waiter.send(outcome.clone());
		}
	}
}

/// Scoped release of the in-flight flag; settles queued callers even if the leader is dropped.
struct InFlightRelease<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl InFlightRelease<'_> {
	fn settle(mut self, outcome: &RefreshOutcome) {
		self.settled = true;
		self.coordinator.release(outcome);
	}
}
impl Drop for InFlightRelease<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.metrics.record_failure();
			self.coordinator
				.release(&Err(RefreshError::Abandoned { realm: self.coordinator.realm.id }));
		}
	}
}
