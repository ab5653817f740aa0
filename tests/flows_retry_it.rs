#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use tokengate::{
	_preludet::*,
	auth::{Realm, RealmId, TokenPair, TokenSecret},
	error::{RefreshError, RefreshFailure},
	flows::RetryState,
	store::{self, TokenStore},
};

fn stored(store: &dyn TokenStore, key: &str) -> Option<String> {
	store.get(key).expect("Store read should succeed.").map(|secret| secret.expose().to_owned())
}

#[tokio::test]
async fn expired_token_is_refreshed_once_and_request_replayed() {
	let server = MockServer::start_async().await;
	let (client, store) =
		build_reqwest_test_client(&server.base_url()).expect("Test client should build.");

	client
		.sign_in(RealmId::User, &test_pair("expired", "valid-refresh"))
		.expect("Fixture sign-in should succeed.");

	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/protected-data").header("authorization", "Bearer expired");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/refresh")
				.header("content-type", "application/json")
				.json_body(serde_json::json!({ "refreshToken": "valid-refresh" }));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"accessToken\":\"T2\"}");
		})
		.await;
	let replayed = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/protected-data").header("authorization", "Bearer T2");
			then.status(200).body("success");
		})
		.await;
	let response =
		client.get("/api/protected-data").await.expect("Replayed request should succeed.");

	expired.assert_async().await;
	refresh.assert_async().await;
	replayed.assert_async().await;

	assert_eq!(response.body().as_slice(), b"success");
	assert_eq!(stored(store.as_ref(), "accessToken:user").as_deref(), Some("T2"));
	assert_eq!(stored(store.as_ref(), "refreshToken:user").as_deref(), Some("valid-refresh"));

	let coordinator =
		client.coordinator(RealmId::User).expect("User realm should have a coordinator.");

	assert_eq!(coordinator.metrics().attempts(), 1);
	assert_eq!(coordinator.metrics().successes(), 1);
}

#[tokio::test]
async fn admin_realm_refreshes_at_its_own_endpoint() {
	let server = MockServer::start_async().await;
	let (client, store) =
		build_reqwest_test_client(&server.base_url()).expect("Test client should build.");

	client.sign_in(RealmId::Admin, &test_pair("stale", "admin-refresh")).expect("Admin sign-in.");

	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/pubOffice/orders").header("authorization", "Bearer stale");
			then.status(403);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/pubOffice/auth/refresh")
				.json_body(serde_json::json!({ "refreshToken": "admin-refresh" }));
			then.status(200).body(
				"{\"data\":{\"accessToken\":\"admin-new\",\"refreshToken\":\"admin-rotated\"}}",
			);
		})
		.await;
	let replayed = server
		.mock_async(|when, then| {
			when.method(GET).path("/pubOffice/orders").header("authorization", "Bearer admin-new");
			then.status(200);
		})
		.await;

	client.get("/pubOffice/orders").await.expect("Admin request should recover.");

	stale.assert_async().await;
	refresh.assert_async().await;
	replayed.assert_async().await;

	assert_eq!(stored(store.as_ref(), "accessToken:admin").as_deref(), Some("admin-new"));
	assert_eq!(stored(store.as_ref(), "refreshToken:admin").as_deref(), Some("admin-rotated"));
	assert_eq!(
		client
			.coordinator(RealmId::User)
			.expect("User realm should have a coordinator.")
			.metrics()
			.attempts(),
		0
	);
}

#[tokio::test]
async fn failed_refresh_surfaces_error_and_logs_realm_out() {
	let server = MockServer::start_async().await;
	let (client, store) =
		build_reqwest_test_client(&server.base_url()).expect("Test client should build.");

	client.sign_in(RealmId::User, &test_pair("expired", "revoked")).expect("Fixture sign-in.");

	let protected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/me");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(400).body("{\"message\":\"refresh token revoked\"}");
		})
		.await;
	let err = client.get("/api/user/me").await.expect_err("Refresh failure must surface.");

	assert!(matches!(
		err,
		Error::Refresh(RefreshError::Failed {
			realm: RealmId::User,
			reason: RefreshFailure::Status { status: StatusCode::BAD_REQUEST },
		})
	));

	protected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	assert!(store.is_empty(), "Both user tokens should be removed after refresh failure.");
}

#[tokio::test]
async fn refresh_response_without_access_token_is_a_failure() {
	let server = MockServer::start_async().await;
	let (client, store) =
		build_reqwest_test_client(&server.base_url()).expect("Test client should build.");

	client.sign_in(RealmId::User, &test_pair("expired", "r-1")).expect("Fixture sign-in.");

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/me");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).body("{\"data\":{}}");
		})
		.await;

	let err = client.get("/api/user/me").await.expect_err("Missing access token must fail.");

	assert!(matches!(
		err,
		Error::Refresh(RefreshError::Failed { reason: RefreshFailure::MissingAccessToken, .. })
	));
	assert!(store.is_empty());
}

#[tokio::test]
async fn missing_refresh_token_fails_without_network_call() {
	let server = MockServer::start_async().await;
	let (client, store) =
		build_reqwest_test_client(&server.base_url()).expect("Test client should build.");

	store
		.set("accessToken:user", &TokenSecret::new("expired"))
		.expect("Fixture token should persist.");

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/me");
			then.status(401);
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).body("{\"accessToken\":\"never\"}");
		})
		.await;
	let err = client.get("/api/user/me").await.expect_err("Missing refresh token must fail.");

	assert!(matches!(
		err,
		Error::Refresh(RefreshError::MissingRefreshToken { realm: RealmId::User })
	));

	refresh.assert_calls_async(0).await;

	assert!(store.is_empty());
}

#[tokio::test]
async fn new_sign_in_discards_previous_refresh_token() {
	let server = MockServer::start_async().await;
	let (client, store) =
		build_reqwest_test_client(&server.base_url()).expect("Test client should build.");

	client
		.sign_in(RealmId::User, &test_pair("first-access", "first-refresh"))
		.expect("First sign-in should succeed.");
	client
		.sign_in(RealmId::User, &TokenPair::access_only("second-access"))
		.expect("Second sign-in should succeed.");

	assert_eq!(stored(store.as_ref(), "accessToken:user").as_deref(), Some("second-access"));
	assert!(stored(store.as_ref(), "refreshToken:user").is_none());

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/me");
			then.status(401);
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).body("{\"accessToken\":\"borrowed\"}");
		})
		.await;
	let err = client.get("/api/user/me").await.expect_err("No refresh token should remain.");

	assert!(matches!(
		err,
		Error::Refresh(RefreshError::MissingRefreshToken { realm: RealmId::User })
	));

	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn already_retried_request_is_sent_once() {
	let server = MockServer::start_async().await;
	let (client, store) =
		build_reqwest_test_client(&server.base_url()).expect("Test client should build.");

	client
		.sign_in(RealmId::User, &test_pair("expired", "R1"))
		.expect("Fixture sign-in should succeed.");

	let protected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/me");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).body("{\"accessToken\":\"T2\"}");
		})
		.await;
	let mut request = test_request(tokengate::http_types::Method::GET, "/api/user/me");

	RetryState::mark_retried(&mut request);

	let err = client.execute(request).await.expect_err("A retried request must not recover.");

	assert_eq!(err.status_code(), Some(StatusCode::UNAUTHORIZED));

	protected.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert_eq!(stored(store.as_ref(), "refreshToken:user").as_deref(), Some("R1"));
}

#[tokio::test]
async fn foreign_host_auth_failure_is_not_refreshed() {
	let api = MockServer::start_async().await;
	let foreign = MockServer::start_async().await;
	let (client, store) =
		build_reqwest_test_client(&api.base_url()).expect("Test client should build.");

	client
		.sign_in(RealmId::User, &test_pair("T1", "R1"))
		.expect("Fixture sign-in should succeed.");

	let rejected = foreign
		.mock_async(|when, then| {
			when.method(GET).path("/api/x");
			then.status(401);
		})
		.await;
	let refresh = api
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).body("{\"accessToken\":\"T2\"}");
		})
		.await;
	let err = client
		.get(&format!("{}/api/x", foreign.base_url()))
		.await
		.expect_err("Foreign 401 must surface unchanged.");

	assert_eq!(err.status_code(), Some(StatusCode::UNAUTHORIZED));

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert_eq!(stored(store.as_ref(), "accessToken:user").as_deref(), Some("T1"));
	assert_eq!(stored(store.as_ref(), "refreshToken:user").as_deref(), Some("R1"));
}

#[tokio::test]
async fn second_auth_failure_is_not_retried() {
	let server = MockServer::start_async().await;
	let (client, _store) =
		build_reqwest_test_client(&server.base_url()).expect("Test client should build.");

	client.sign_in(RealmId::User, &test_pair("expired", "r-1")).expect("Fixture sign-in.");

	let protected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/me");
			then.status(401).body("still unauthorized");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).body("{\"accessToken\":\"T2\"}");
		})
		.await;
	let err = client.get("/api/user/me").await.expect_err("Second 401 must surface.");

	assert_eq!(err.status_code(), Some(StatusCode::UNAUTHORIZED));
	assert_eq!(
		err.into_response().expect("Status errors should carry the response.").body().as_slice(),
		b"still unauthorized"
	);

	protected.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn refresh_endpoint_failures_never_recurse() {
	let server = MockServer::start_async().await;
	let (client, _store) =
		build_reqwest_test_client(&server.base_url()).expect("Test client should build.");

	client.sign_in(RealmId::User, &test_pair("expired", "r-1")).expect("Fixture sign-in.");

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(401);
		})
		.await;
	let err = client
		.post_json("/auth/refresh", &serde_json::json!({ "refreshToken": "r-1" }))
		.await
		.expect_err("Refresh endpoint 401 must surface.");

	assert_eq!(err.status_code(), Some(StatusCode::UNAUTHORIZED));

	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn non_auth_failures_pass_through_untouched() {
	let server = MockServer::start_async().await;
	let (client, store) =
		build_reqwest_test_client(&server.base_url()).expect("Test client should build.");

	client.sign_in(RealmId::User, &test_pair("valid", "r-1")).expect("Fixture sign-in.");

	let failing = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/me");
			then.status(503);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).body("{\"accessToken\":\"T2\"}");
		})
		.await;
	let err = client.get("/api/user/me").await.expect_err("503 must surface.");

	assert_eq!(err.status_code(), Some(StatusCode::SERVICE_UNAVAILABLE));

	failing.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert_eq!(stored(store.as_ref(), "accessToken:user").as_deref(), Some("valid"));
}

#[tokio::test]
async fn public_url_drops_stale_token_and_retries_once() {
	let server = MockServer::start_async().await;
	let registry = tokengate::auth::RealmRegistry::standard(
		tokengate::auth::PublicAllowlist::new(["/calendar"]),
	);
	let (client, store) = build_reqwest_test_client_with(
		registry,
		Url::parse(&server.base_url()).expect("Mock server URL should parse."),
	);

	client.sign_in(RealmId::User, &test_pair("stale", "r-1")).expect("Fixture sign-in.");

	let stale_header = server
		.mock_async(|when, then| {
			when.method(GET).path("/calendar").header("authorization", "Bearer stale");
			then.status(401);
		})
		.await;
	let anonymous = server
		.mock_async(|when, then| {
			when.method(GET).path("/calendar").header_missing("authorization");
			then.status(401);
		})
		.await;
	let mut request = test_request(tokengate::http_types::Method::GET, "/calendar");

	// Simulates a caller that attached a token by hand.
	request = tokengate::flows::apply_bearer(request, &TokenSecret::new("stale"));

	let err = client.execute(request).await.expect_err("Second failure must surface.");

	assert_eq!(err.status_code(), Some(StatusCode::UNAUTHORIZED));

	stale_header.assert_calls_async(1).await;
	anonymous.assert_calls_async(1).await;

	assert!(
		store::load_access_token(store.as_ref(), &Realm::user())
			.expect("Store read should succeed.")
			.is_none()
	);
	assert!(stored(store.as_ref(), "refreshToken:user").is_none());
}

#[tokio::test]
async fn public_url_retry_can_succeed_anonymously() {
	let server = MockServer::start_async().await;
	let (client, _store) =
		build_reqwest_test_client(&server.base_url()).expect("Test client should build.");
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/calendar/2025").header_exists("authorization");
			then.status(403);
		})
		.await;
	let anonymous = server
		.mock_async(|when, then| {
			when.method(GET).path("/calendar/2025").header_missing("authorization");
			then.status(200).body("[]");
		})
		.await;
	let request = tokengate::flows::apply_bearer(
		test_request(tokengate::http_types::Method::GET, "/calendar/2025"),
		&TokenSecret::new("stale"),
	);
	let response = client.execute(request).await.expect("Anonymous retry should succeed.");

	stale.assert_calls_async(1).await;
	anonymous.assert_calls_async(1).await;

	assert_eq!(response.body().as_slice(), b"[]");
}
