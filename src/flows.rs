//! Client pipeline: tag → send → classify → recover.

pub mod refresh;
pub mod retry;
pub mod tagging;

pub use refresh::*;
pub use retry::*;
pub use tagging::*;

// crates.io
use oauth2::http::{Method, Request, header::CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	auth::{RealmId, RealmRegistry, TokenPair, TokenSecret},
	error::{ConfigError, TransportError},
	http::ApiTransport,
	store::{self, TokenStore},
};
#[cfg(feature = "reqwest")]
use crate::{config::ClientConfig, http::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAuthClient = AuthClient<ReqwestTransport>;

/// HTTP client that attaches realm bearer tokens and recovers from expired ones.
///
/// The client owns the raw transport, the token store, the realm registry, and one
/// [`RefreshCoordinator`] per realm. Coordinators are created once, at construction, and shared
/// by every clone of the client so concurrent requests for a realm refresh at most once.
pub struct AuthClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Raw transport; sending through it bypasses tagging and retry.
	pub transport: Arc<T>,
	/// Token store holding every realm's secrets.
	pub store: Arc<dyn TokenStore>,
	registry: Arc<RealmRegistry>,
	coordinators: Arc<HashMap<RealmId, Arc<RefreshCoordinator>>>,
}
impl<T> AuthClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a client over a caller-provided transport.
	pub fn with_transport(
		transport: impl Into<Arc<T>>,
		store: Arc<dyn TokenStore>,
		registry: RealmRegistry,
	) -> Self {
		let coordinators = registry
			.iter()
			.map(|realm| (realm.id, Arc::new(RefreshCoordinator::new(Arc::clone(realm)))))
			.collect();

		Self {
			transport: transport.into(),
			store,
			registry: Arc::new(registry),
			coordinators: Arc::new(coordinators),
		}
	}

	/// Realm routing table.
	pub fn registry(&self) -> &RealmRegistry {
		&self.registry
	}

	/// Refresh coordinator for `realm`, if registered.
	pub fn coordinator(&self, realm: RealmId) -> Option<&Arc<RefreshCoordinator>> {
		self.coordinators.get(&realm)
	}

	/// Replaces the realm's session with a freshly issued token pair.
	///
	/// Secrets of the previous session are dropped first, so an access-only pair never inherits
	/// an older refresh token.
	pub fn sign_in(&self, realm: RealmId, pair: &TokenPair) -> Result<()> {
		let realm = self.registry.get(realm).ok_or(ConfigError::UnknownRealm { realm })?;

		store::clear_realm(self.store.as_ref(), realm)?;
		store::persist_pair(self.store.as_ref(), realm, pair)?;

		Ok(())
	}

	/// Removes both secrets of `realm`.
	pub fn sign_out(&self, realm: RealmId) -> Result<()> {
		let realm = self.registry.get(realm).ok_or(ConfigError::UnknownRealm { realm })?;

		store::clear_realm(self.store.as_ref(), realm)?;

		Ok(())
	}

	/// Runs (or joins) a coordinated refresh for `realm` and returns the new access token.
	pub async fn refresh(&self, realm: RealmId) -> Result<TokenSecret> {
		let coordinator = self.coordinator(realm).ok_or(ConfigError::UnknownRealm { realm })?;

		Ok(coordinator.refresh(self.transport.as_ref(), self.store.as_ref()).await?)
	}

	/// Sends a `GET` to `path` through the full pipeline.
	pub async fn get(&self, path: &str) -> Result<HttpResponse> {
		let request = Request::builder()
			.method(Method::GET)
			.uri(path)
			.body(Vec::new())
			.map_err(TransportError::from)?;

		self.execute(request).await
	}

	/// Sends a JSON `POST` to `path` through the full pipeline.
	pub async fn post_json<B>(&self, path: &str, body: &B) -> Result<HttpResponse>
	where
		B: ?Sized + Serialize,
	{
		let payload = serde_json::to_vec(body).map_err(TransportError::from)?;
		let request = Request::builder()
			.method(Method::POST)
			.uri(path)
			.header(CONTENT_TYPE, "application/json")
			.body(payload)
			.map_err(TransportError::from)?;

		self.execute(request).await
	}
}
#[cfg(feature = "reqwest")]
impl AuthClient<ReqwestTransport> {
	/// Creates a client backed by reqwest and the standard realm table.
	///
	/// The public allowlist comes from `config`; use [`AuthClient::with_transport`] for custom
	/// realm tables.
	pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Self {
		let registry = RealmRegistry::standard(config.public_paths);

		Self::with_transport(ReqwestTransport::new(config.base_url), store, registry)
	}
}
impl<T> Clone for AuthClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			store: Arc::clone(&self.store),
			registry: Arc::clone(&self.registry),
			coordinators: Arc::clone(&self.coordinators),
		}
	}
}
impl<T> Debug for AuthClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthClient")
			.field("registry", &self.registry)
			.field("coordinators", &self.coordinators.len())
			.finish()
	}
}
