//! Transport primitives the client pipeline is composed over.
//!
//! Requests are [`HttpRequest`] values whose URI carries the path (and query) relative to the
//! deployment's base URL, so realm routing never depends on the host. [`ApiTransport`] is the
//! raw, hook-free transport: the [`AuthClient`](crate::flows::AuthClient) wraps it with tagging
//! and retry, while refresh calls go straight through it.

// crates.io
use oauth2::http::Uri;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing a single request.
///
/// Implementations must return `Ok` for every response that reached the process, regardless of
/// status code; status classification happens in the client pipeline. Implementations must be
/// `Send + Sync + 'static` so one transport can back every realm coordinator.
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` without any interception.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;

	/// Origin that relative request targets resolve against, if the transport has one.
	///
	/// Absolute request URIs only reach a realm when they point at this origin.
	fn origin(&self) -> Option<&Url> {
		None
	}
}
impl<T> ApiTransport for Arc<T>
where
	T: ?Sized + ApiTransport,
{
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		(**self).send(request)
	}

	fn origin(&self) -> Option<&Url> {
		(**self).origin()
	}
}

/// Returns the routing target of a request URI: path plus query, or `/` when empty.
pub fn route_target(uri: &Uri) -> &str {
	uri.path_and_query().map(|pq| pq.as_str()).filter(|target| !target.is_empty()).unwrap_or("/")
}

/// Returns the routing target of `uri` if it addresses `origin`, or `None` for foreign hosts.
///
/// Relative URIs always qualify. An absolute URI qualifies only when it points at `origin`
/// itself, in which case the origin's base path is stripped so realm prefixes match the same
/// way they do for relative targets.
pub fn local_target<'a>(uri: &'a Uri, origin: Option<&Url>) -> Option<&'a str> {
	if uri.scheme().is_none() && uri.authority().is_none() {
		return Some(route_target(uri));
	}

	let origin = origin?;
	let scheme = uri.scheme_str()?;
	let port = uri.port_u16().or(match scheme {
		"http" => Some(80),
		"https" => Some(443),
		_ => None,
	});
	let same_host =
		uri.host().zip(origin.host_str()).is_some_and(|(host, own)| host.eq_ignore_ascii_case(own));

	if !scheme.eq_ignore_ascii_case(origin.scheme())
		|| !same_host
		|| port != origin.port_or_known_default()
	{
		return None;
	}

	let target = route_target(uri);
	let base_path = origin.path().trim_end_matches('/');

	if base_path.is_empty() {
		return Some(target);
	}

	match target.strip_prefix(base_path) {
		Some("") => Some("/"),
		Some(rest) if rest.starts_with('/') => Some(rest),
		_ => Some(target),
	}
}

/// Joins `base` with a request target by concatenation, so base paths are preserved.
pub fn join_base(base: &Url, target: &str) -> Result<Url, TransportError> {
	let joined = format!(
		"{}/{}",
		base.as_str().trim_end_matches('/'),
		target.trim_start_matches('/')
	);

	Url::parse(&joined).map_err(|source| TransportError::InvalidUrl { url: joined, source })
}

/// Reqwest-backed transport that resolves relative request targets against a base URL.
///
/// Redirects should be disabled on any custom [`ReqwestClient`] so a 401 from a redirect target
/// is attributed to the URL the client actually routed.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	base_url: Url,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Creates a transport with a default reqwest client.
	pub fn new(base_url: Url) -> Self {
		Self::with_client(ReqwestClient::default(), base_url)
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient, base_url: Url) -> Self {
		Self { client, base_url }
	}

	/// Base URL every request target is joined with.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn origin(&self) -> Option<&Url> {
		Some(&self.base_url)
	}

	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let url = if request.uri().scheme().is_some() {
				Url::parse(&request.uri().to_string()).map_err(|source| {
					TransportError::InvalidUrl { url: request.uri().to_string(), source }
				})?
			} else {
				join_base(&self.base_url, route_target(request.uri()))?
			};
			let (parts, body) = request.into_parts();
			let mut outbound = reqwest::Request::new(parts.method, url);

			*outbound.headers_mut() = parts.headers;
			*outbound.body_mut() = Some(body.into());

			let response = self.client.execute(outbound).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
