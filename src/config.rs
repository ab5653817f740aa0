//! Externally supplied client configuration: base URL and public allowlist.

// std
use std::env;
// self
use crate::{_prelude::*, auth::PublicAllowlist, error::ConfigError};

/// Environment variable holding the API base URL.
pub const ENV_API_URL: &str = "TOKENGATE_API_URL";
/// Environment variable holding comma-separated public URL fragments.
pub const ENV_PUBLIC_PATHS: &str = "TOKENGATE_PUBLIC_PATHS";

/// Deployment-specific settings consumed when building a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Base URL every relative request target is joined with.
	pub base_url: Url,
	/// URL fragments exempt from realm routing.
	#[serde(default = "default_public_paths")]
	pub public_paths: PublicAllowlist,
}
impl ClientConfig {
	/// Creates a config with the default public allowlist (`/calendar`).
	pub fn new(base_url: Url) -> Self {
		Self { base_url, public_paths: default_public_paths() }
	}

	/// Parses `base_url` and creates a config with the default public allowlist.
	pub fn parse(base_url: &str) -> Result<Self, ConfigError> {
		let url = Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl {
			value: base_url.to_owned(),
			source,
		})?;

		Ok(Self::new(url))
	}

	/// Reads [`ENV_API_URL`] and, when set, [`ENV_PUBLIC_PATHS`].
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Replaces the public allowlist.
	pub fn with_public_paths<I, S>(mut self, paths: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.public_paths = PublicAllowlist::new(paths);

		self
	}

	fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
		let base_url = lookup(ENV_API_URL).ok_or(ConfigError::MissingEnv { name: ENV_API_URL })?;
		let config = Self::parse(&base_url)?;

		match lookup(ENV_PUBLIC_PATHS) {
			Some(raw) => Ok(config.with_public_paths(raw.split(','))),
			None => Ok(config),
		}
	}
}

fn default_public_paths() -> PublicAllowlist {
	PublicAllowlist::new(["/calendar"])
}
