//! Client-level error types shared across tagging, refresh, and retry flows.

// self
use crate::{_prelude::*, auth::RealmId, store::StoreError};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS) while sending the request.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token refresh could not produce a new access token.
	#[error(transparent)]
	Refresh(#[from] RefreshError),

	/// Upstream answered with a non-success status.
	#[error("Request failed with HTTP {status}.")]
	Status {
		/// Response status code.
		status: StatusCode,
		/// Full upstream response, body included.
		response: Box<HttpResponse>,
	},
}
impl Error {
	/// Wraps a non-success response.
	pub fn status(response: HttpResponse) -> Self {
		Self::Status { status: response.status(), response: Box::new(response) }
	}

	/// Returns the upstream status code when the error carries a response.
	pub fn status_code(&self) -> Option<StatusCode> {
		match self {
			Self::Status { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Returns `true` for 401/403 responses, the only failures the retry flow intercepts.
	pub fn is_auth_failure(&self) -> bool {
		matches!(self.status_code(), Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN))
	}

	/// Consumes the error and returns the upstream response, if any.
	pub fn into_response(self) -> Option<HttpResponse> {
		match self {
			Self::Status { response, .. } => Some(*response),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid: {value}.")]
	InvalidBaseUrl {
		/// Raw value that failed to parse.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A required environment variable is not set.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// Realm registry failed validation.
	#[error(transparent)]
	Registry(#[from] crate::auth::RegistryError),
	/// Requested realm is not registered on this client.
	#[error("Realm `{realm}` is not registered.")]
	UnknownRealm {
		/// Requested realm.
		realm: RealmId,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, request construction).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request target could not be joined with the base URL.
	#[error("Request URL is invalid: {url}.")]
	InvalidUrl {
		/// URL that failed to parse.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request could not be assembled.
	#[error(transparent)]
	InvalidRequest(#[from] oauth2::http::Error),
	/// Request body could not be encoded as JSON.
	#[error("Request body could not be encoded as JSON.")]
	Encode(#[from] serde_json::Error),
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Outcome shared by the refresh leader and every caller queued behind it.
#[derive(Clone, Debug, ThisError)]
pub enum RefreshError {
	/// The realm has no refresh token in storage.
	#[error("No refresh token is stored for the `{realm}` realm.")]
	MissingRefreshToken {
		/// Realm that attempted the refresh.
		realm: RealmId,
	},
	/// The refresh call failed or returned no usable access token.
	#[error("Token refresh for the `{realm}` realm failed.")]
	Failed {
		/// Realm that attempted the refresh.
		realm: RealmId,
		/// Failure detail.
		#[source]
		reason: RefreshFailure,
	},
	/// The refreshing task was dropped before it settled.
	#[error("Token refresh for the `{realm}` realm was abandoned before it completed.")]
	Abandoned {
		/// Realm that attempted the refresh.
		realm: RealmId,
	},
}
impl RefreshError {
	/// Realm the refresh was attempted for.
	pub fn realm(&self) -> RealmId {
		match self {
			Self::MissingRefreshToken { realm }
			| Self::Failed { realm, .. }
			| Self::Abandoned { realm } => *realm,
		}
	}
}

/// Reasons a refresh call did not yield a new access token.
#[derive(Clone, Debug, ThisError)]
pub enum RefreshFailure {
	/// The refresh endpoint could not be reached.
	#[error("Refresh endpoint could not be reached.")]
	Transport(#[source] Arc<TransportError>),
	/// The refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint responded with HTTP {status}.")]
	Status {
		/// Response status code.
		status: StatusCode,
	},
	/// The refresh endpoint returned malformed JSON.
	#[error("Refresh endpoint returned malformed JSON.")]
	Parse(#[source] Arc<serde_path_to_error::Error<serde_json::Error>>),
	/// No extraction strategy found an access token in the response.
	#[error("Refresh response did not contain an access token.")]
	MissingAccessToken,
	/// The refreshed secrets could not be persisted.
	#[error("Refreshed tokens could not be stored.")]
	Storage(#[source] StoreError),
}
impl From<TransportError> for RefreshFailure {
	fn from(e: TransportError) -> Self {
		Self::Transport(Arc::new(e))
	}
}
