//! Ordered realm table and public allowlist used to route request URLs.
//!
//! Realms are tested in declaration order and the first match wins, so more specific realms
//! (for example an admin path prefix) must be declared before catch-all realms. URLs on the
//! public allowlist are never routed to a realm and never receive a token.

// std
use std::collections::HashSet;
// self
use crate::{
	_prelude::*,
	auth::realm::{Realm, RealmId},
};

/// Errors raised while constructing or validating a [`RealmRegistry`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum RegistryError {
	/// At least one realm must be registered.
	#[error("Registry must contain at least one realm.")]
	NoRealms,
	/// Realm identifiers must be unique.
	#[error("Realm `{realm}` is registered more than once.")]
	DuplicateRealm {
		/// Duplicated realm identifier.
		realm: RealmId,
	},
	/// Storage keys must be non-empty and distinct across realms.
	#[error("Realm `{realm}` uses an empty or shared storage key `{key}`.")]
	InvalidStorageKey {
		/// Offending realm identifier.
		realm: RealmId,
		/// Offending key.
		key: String,
	},
	/// Refresh endpoints are paths relative to the base URL.
	#[error("Realm `{realm}` refresh path must start with `/`: {path}.")]
	InvalidRefreshPath {
		/// Offending realm identifier.
		realm: RealmId,
		/// Path that failed validation.
		path: String,
	},
	/// A realm declared after a catch-all realm can never be selected.
	#[error("Realm `{realm}` is unreachable because `{shadowed_by}` claims every URL first.")]
	Unreachable {
		/// Realm that can never match.
		realm: RealmId,
		/// Catch-all realm declared earlier.
		shadowed_by: RealmId,
	},
	/// The default realm must be one of the registered realms.
	#[error("Default realm `{realm}` is not registered.")]
	UnknownDefaultRealm {
		/// Requested default realm.
		realm: RealmId,
	},
}

/// URL fragments exempt from realm routing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicAllowlist(Vec<String>);
impl PublicAllowlist {
	/// Builds an allowlist from the provided URL fragments, skipping blank entries.
	pub fn new<I, S>(entries: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self(
			entries
				.into_iter()
				.map(Into::into)
				.map(|entry: String| entry.trim().to_owned())
				.filter(|entry| !entry.is_empty())
				.collect(),
		)
	}

	/// Returns `true` when any allowlisted fragment occurs in `url`.
	pub fn contains(&self, url: &str) -> bool {
		self.0.iter().any(|entry| url.contains(entry.as_str()))
	}

	/// Iterates over the allowlisted fragments.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Returns `true` when nothing is allowlisted.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Immutable, ordered table of realms plus the public allowlist.
#[derive(Clone, Debug)]
pub struct RealmRegistry {
	realms: Vec<Arc<Realm>>,
	public: PublicAllowlist,
	default_realm: Arc<Realm>,
}
impl RealmRegistry {
	/// Returns a new builder.
	pub fn builder() -> RealmRegistryBuilder {
		RealmRegistryBuilder::default()
	}

	/// Reference deployment: `admin` (under `/pubOffice`) tested before the catch-all `user`
	/// realm, which is also the default realm.
	pub fn standard(public: PublicAllowlist) -> Self {
		let user = Arc::new(Realm::user());

		Self {
			realms: vec![Arc::new(Realm::admin()), Arc::clone(&user)],
			public,
			default_realm: user,
		}
	}

	/// Resolves the realm owning `url`; public URLs belong to no realm.
	pub fn resolve(&self, url: &str) -> Option<&Arc<Realm>> {
		if self.is_public(url) {
			return None;
		}

		self.realms.iter().find(|realm| realm.owns(url))
	}

	/// Returns `true` when `url` is on the public allowlist.
	pub fn is_public(&self, url: &str) -> bool {
		self.public.contains(url)
	}

	/// Looks up a realm by identifier.
	pub fn get(&self, id: RealmId) -> Option<&Arc<Realm>> {
		self.realms.iter().find(|realm| realm.id == id)
	}

	/// Realm whose tokens are dropped when a public URL rejects a stale token.
	pub fn default_realm(&self) -> &Arc<Realm> {
		&self.default_realm
	}

	/// Iterates over realms in evaluation order.
	pub fn iter(&self) -> impl Iterator<Item = &Arc<Realm>> {
		self.realms.iter()
	}

	/// Returns the public allowlist.
	pub fn public(&self) -> &PublicAllowlist {
		&self.public
	}
}
impl Default for RealmRegistry {
	fn default() -> Self {
		Self::standard(PublicAllowlist::new(["/calendar"]))
	}
}

/// Builder for [`RealmRegistry`] values.
#[derive(Debug, Default)]
pub struct RealmRegistryBuilder {
	/// Realms in evaluation order.
	pub realms: Vec<Realm>,
	/// Public allowlist.
	pub public: PublicAllowlist,
	/// Explicit default realm; falls back to the catch-all realm, then the last realm.
	pub default_realm: Option<RealmId>,
}
impl RealmRegistryBuilder {
	/// Appends a realm; earlier realms win when several match.
	pub fn realm(mut self, realm: Realm) -> Self {
		self.realms.push(realm);

		self
	}

	/// Replaces the public allowlist.
	pub fn public(mut self, public: PublicAllowlist) -> Self {
		self.public = public;

		self
	}

	/// Sets the realm whose tokens are dropped on public-URL recovery.
	pub fn default_realm(mut self, realm: RealmId) -> Self {
		self.default_realm = Some(realm);

		self
	}

	/// Validates and builds the registry.
	pub fn build(self) -> Result<RealmRegistry, RegistryError> {
		if self.realms.is_empty() {
			return Err(RegistryError::NoRealms);
		}

		let mut ids = HashSet::new();
		let mut keys = HashSet::new();
		let mut catch_all = None;

		for realm in &self.realms {
			if !ids.insert(realm.id) {
				return Err(RegistryError::DuplicateRealm { realm: realm.id });
			}
			if let Some(shadowed_by) = catch_all {
				return Err(RegistryError::Unreachable { realm: realm.id, shadowed_by });
			}

			for key in [&realm.access_key, &realm.refresh_key] {
				if key.trim().is_empty() || !keys.insert(key.as_str()) {
					return Err(RegistryError::InvalidStorageKey {
						realm: realm.id,
						key: key.clone(),
					});
				}
			}

			if !realm.refresh_path.starts_with('/') {
				return Err(RegistryError::InvalidRefreshPath {
					realm: realm.id,
					path: realm.refresh_path.clone(),
				});
			}
			if realm.matcher.is_catch_all() {
				catch_all = Some(realm.id);
			}
		}

		let default_id = match self.default_realm {
			Some(id) if ids.contains(&id) => Some(id),
			Some(id) => return Err(RegistryError::UnknownDefaultRealm { realm: id }),
			None => catch_all,
		};
		let realms = self.realms.into_iter().map(Arc::new).collect::<Vec<_>>();
		let default_realm = default_id
			.and_then(|id| realms.iter().find(|realm| realm.id == id))
			.or_else(|| realms.last())
			.cloned()
			.ok_or(RegistryError::NoRealms)?;

		Ok(RealmRegistry { realms, public: self.public, default_realm })
	}
}
