//! Request Tagger: attaches the routed realm's bearer token to outbound requests.

// crates.io
use oauth2::http::header::{AUTHORIZATION, HeaderValue};
// self
use crate::{
	_prelude::*,
	auth::{RealmRegistry, TokenSecret},
	http::local_target,
	obs::{FlowKind, FlowSpan},
	store::{self, TokenStore},
};

/// Tags `request` with `Authorization: Bearer <token>` when its URL resolves to a realm that has
/// an access token in storage. Requests without a realm or token pass through unchanged, and so
/// do absolute URIs that do not point at `origin`.
///
/// Only reads from storage. Fails only when the store itself fails.
pub fn tag(
	request: HttpRequest,
	registry: &RealmRegistry,
	store: &dyn TokenStore,
	origin: Option<&Url>,
) -> Result<HttpRequest> {
	let Some(realm) =
		local_target(request.uri(), origin).and_then(|target| registry.resolve(target))
	else {
		return Ok(request);
	};
	let _span = FlowSpan::with_realm(FlowKind::Tag, "tag", Some(realm.id)).entered();

	match store::load_access_token(store, realm)? {
		Some(token) => Ok(apply_bearer(request, &token)),
		None => Ok(request),
	}
}

/// Sets (or replaces) the bearer `Authorization` header.
///
/// A token that cannot be encoded as a header value leaves the request untouched.
pub fn apply_bearer(mut request: HttpRequest, token: &TokenSecret) -> HttpRequest {
	match HeaderValue::from_str(&token.bearer()) {
		Ok(mut value) => {
			value.set_sensitive(true);
			request.headers_mut().insert(AUTHORIZATION, value);
		},
		Err(_e) => {
			#[cfg(feature = "tracing")]
			tracing::warn!("Stored access token is not a valid header value: {_e}.");
		},
	}

	request
}

/// Removes any `Authorization` header from the request.
pub fn strip_bearer(mut request: HttpRequest) -> HttpRequest {
	request.headers_mut().remove(AUTHORIZATION);

	request
}
