//! Realm definitions: trust domains with their own token pair and refresh endpoint.

// self
use crate::_prelude::*;

/// Fixed set of trust domains a client can route requests into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealmId {
	/// Ordinary end-user session.
	User,
	/// Administrative session with its own login.
	Admin,
}
impl RealmId {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RealmId::User => "user",
			RealmId::Admin => "admin",
		}
	}
}
impl Display for RealmId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// URL ownership rule evaluated against the request path (and query).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum RealmMatcher {
	/// Owns every URL starting with the prefix.
	PathPrefix(String),
	/// Owns every URL; only meaningful as the last realm in a registry.
	Any,
}
impl RealmMatcher {
	/// Returns `true` when the matcher claims `url`.
	pub fn matches(&self, url: &str) -> bool {
		match self {
			RealmMatcher::PathPrefix(prefix) => url.starts_with(prefix.as_str()),
			RealmMatcher::Any => true,
		}
	}

	/// Returns `true` when the matcher claims every URL.
	pub fn is_catch_all(&self) -> bool {
		matches!(self, RealmMatcher::Any)
	}
}

/// Statically configured trust domain.
///
/// Realms are immutable once registered. Ownership checks ignore the public allowlist; the
/// [`RealmRegistry`](crate::auth::RealmRegistry) applies the allowlist before consulting realms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Realm {
	/// Realm identifier.
	pub id: RealmId,
	/// Storage key holding the access token.
	pub access_key: String,
	/// Storage key holding the refresh token.
	pub refresh_key: String,
	/// Path of the refresh endpoint, relative to the client base URL.
	pub refresh_path: String,
	/// URL ownership rule.
	pub matcher: RealmMatcher,
}
impl Realm {
	/// Creates a realm definition.
	pub fn new(
		id: RealmId,
		access_key: impl Into<String>,
		refresh_key: impl Into<String>,
		refresh_path: impl Into<String>,
		matcher: RealmMatcher,
	) -> Self {
		Self {
			id,
			access_key: access_key.into(),
			refresh_key: refresh_key.into(),
			refresh_path: refresh_path.into(),
			matcher,
		}
	}

	/// Administrative realm owning `/pubOffice` URLs.
	pub fn admin() -> Self {
		Self::new(
			RealmId::Admin,
			"accessToken:admin",
			"refreshToken:admin",
			"/pubOffice/auth/refresh",
			RealmMatcher::PathPrefix("/pubOffice".into()),
		)
	}

	/// End-user realm owning every URL not claimed earlier.
	pub fn user() -> Self {
		Self::new(
			RealmId::User,
			"accessToken:user",
			"refreshToken:user",
			"/auth/refresh",
			RealmMatcher::Any,
		)
	}

	/// Returns `true` when the realm claims `url`.
	pub fn owns(&self, url: &str) -> bool {
		self.matcher.matches(url)
	}

	/// Returns `true` when `url` targets this realm's refresh endpoint.
	pub fn is_refresh_endpoint(&self, url: &str) -> bool {
		url.contains(self.refresh_path.as_str())
	}
}
