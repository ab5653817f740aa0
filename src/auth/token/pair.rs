//! Access/refresh token pair issued for a realm session.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Access + refresh secrets persisted together under realm-specific keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
	/// Short-lived bearer token attached to outbound requests.
	pub access_token: TokenSecret,
	/// Long-lived secret exchanged at the realm's refresh endpoint.
	pub refresh_token: Option<TokenSecret>,
}
impl TokenPair {
	/// Creates a pair with both secrets present.
	pub fn new(access_token: impl Into<TokenSecret>, refresh_token: impl Into<TokenSecret>) -> Self {
		Self { access_token: access_token.into(), refresh_token: Some(refresh_token.into()) }
	}

	/// Creates a pair that carries only an access token.
	pub fn access_only(access_token: impl Into<TokenSecret>) -> Self {
		Self { access_token: access_token.into(), refresh_token: None }
	}
}
