//! Synchronous key-value token storage and realm-scoped helpers.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Realm, TokenPair, TokenSecret},
};

/// Storage backend contract for persisted token secrets.
///
/// Calls are synchronous and must not block on network I/O; the client invokes them from async
/// contexts without yielding.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns the secret stored under `key`, if present.
	fn get(&self, key: &str) -> Result<Option<TokenSecret>, StoreError>;

	/// Stores or replaces the secret under `key`.
	fn set(&self, key: &str, value: &TokenSecret) -> Result<(), StoreError>;

	/// Removes `key`; removing an absent key is not an error.
	fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Reads the realm's access token. Empty values count as absent.
pub fn load_access_token(
	store: &dyn TokenStore,
	realm: &Realm,
) -> Result<Option<TokenSecret>, StoreError> {
	Ok(store.get(&realm.access_key)?.filter(|secret| !secret.is_empty()))
}

/// Reads the realm's refresh token. Empty values count as absent.
pub fn load_refresh_token(
	store: &dyn TokenStore,
	realm: &Realm,
) -> Result<Option<TokenSecret>, StoreError> {
	Ok(store.get(&realm.refresh_key)?.filter(|secret| !secret.is_empty()))
}

/// Persists a token pair; an absent refresh token leaves the stored one untouched.
pub fn persist_pair(
	store: &dyn TokenStore,
	realm: &Realm,
	pair: &TokenPair,
) -> Result<(), StoreError> {
	store.set(&realm.access_key, &pair.access_token)?;

	if let Some(refresh) = pair.refresh_token.as_ref().filter(|secret| !secret.is_empty()) {
		store.set(&realm.refresh_key, refresh)?;
	}

	Ok(())
}

/// Removes both secrets of the realm. Both removals are attempted; the first error wins.
pub fn clear_realm(store: &dyn TokenStore, realm: &Realm) -> Result<(), StoreError> {
	let access = store.remove(&realm.access_key);
	let refresh = store.remove(&realm.refresh_key);

	access.and(refresh)
}
