//! Realm-aware bearer token middleware: route each request to its trust domain, attach the
//! realm's access token, and recover from expiry with one coordinated refresh per realm.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers shared by the integration tests.

	pub use crate::_prelude::*;

	// crates.io
	use oauth2::http::{Method, Uri};
	// self
	use crate::{
		auth::{RealmRegistry, TokenPair},
		config::ClientConfig,
		error::ConfigError,
		flows::{AuthClient, ReqwestAuthClient},
		http::ReqwestTransport,
		store::{MemoryStore, TokenStore},
	};

	/// Builds a reqwest-backed client with the standard realm table, pointed at `base_url`, and
	/// returns it alongside its in-memory store.
	pub fn build_reqwest_test_client(
		base_url: &str,
	) -> Result<(ReqwestAuthClient, Arc<MemoryStore>), ConfigError> {
		let config = ClientConfig::parse(base_url)?;

		Ok(build_reqwest_test_client_with(
			RealmRegistry::standard(config.public_paths),
			config.base_url,
		))
	}

	/// Same as [`build_reqwest_test_client`] with a caller-provided realm table.
	pub fn build_reqwest_test_client_with(
		registry: RealmRegistry,
		base_url: Url,
	) -> (ReqwestAuthClient, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let client = AuthClient::with_transport(ReqwestTransport::new(base_url), store, registry);

		(client, store_backend)
	}

	/// Builds a body-less request for a static `path`.
	pub fn test_request(method: Method, path: &'static str) -> HttpRequest {
		let mut request = HttpRequest::new(Vec::new());

		*request.method_mut() = method;
		*request.uri_mut() = Uri::from_static(path);

		request
	}

	/// Shorthand for a token pair fixture.
	pub fn test_pair(access: &str, refresh: &str) -> TokenPair {
		TokenPair::new(access, refresh)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use oauth2::{HttpRequest, HttpResponse, http::StatusCode};
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
