//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{StoreError, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<String, TokenSecret>>>;

/// Thread-safe storage backend that keeps secrets in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns `true` when a value is stored under `key`.
	pub fn contains(&self, key: &str) -> bool {
		self.0.read().contains_key(key)
	}

	/// Number of stored keys.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl TokenStore for MemoryStore {
	fn get(&self, key: &str) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.0.read().get(key).cloned())
	}

	fn set(&self, key: &str, value: &TokenSecret) -> Result<(), StoreError> {
		self.0.write().insert(key.to_owned(), value.clone());

		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StoreError> {
		self.0.write().remove(key);

		Ok(())
	}
}
