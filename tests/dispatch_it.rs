mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use reqwest::{
	Method,
	header::{AUTHORIZATION, HeaderName, HeaderValue},
};
use time::{Duration, OffsetDateTime};
// self
use common::*;
use downstream_broker::{
	api::GrantKind,
	auth::{CachedToken, ScopeSet},
	client::ApiClient,
	dispatch::OutboundRequest,
	error::{AcquisitionError, ConfigError, DownstreamCallError, Error},
	store::{MemoryStore, TokenCacheKey, TokenCacheStore},
};

fn app_key() -> TokenCacheKey {
	TokenCacheKey::new(
		GrantKind::AppOnly,
		ScopeSet::new([APP_SCOPE]).expect("Scope fixture should be valid."),
		None,
	)
}

#[tokio::test]
async fn app_only_call_acquires_caches_and_returns_body() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/hello").header("authorization", "Bearer app-1");
			then.status(200).body("Hello from APINoGraph.");
		})
		.await;
	let store = Arc::new(MemoryStore::default());
	let acquirer = ScriptedAcquirer::issuing("app");
	let dispatcher = Arc::new(dispatcher(&server.base_url(), store.clone(), acquirer.clone()));
	let client = ApiClient::new(dispatcher.clone());
	let body = client.get(APP_API, "api/hello").await.expect("APINoGraph call should succeed.");

	assert_eq!(body, "Hello from APINoGraph.");
	assert_eq!(acquirer.calls(), 1);
	assert_eq!(store.len(), 1);

	let request = &acquirer.requests()[0];

	assert_eq!(request.grant, GrantKind::AppOnly);
	assert!(request.principal.is_none());
	assert!(request.scopes.contains(APP_SCOPE));

	mock.assert_async().await;
}

#[tokio::test]
async fn warm_cache_skips_acquisition_and_reuses_header() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/hello").header("authorization", "Bearer app-1");
			then.status(200).body("Hello from APINoGraph.");
		})
		.await;
	let acquirer = ScriptedAcquirer::issuing("app");
	let dispatcher = Arc::new(dispatcher(
		&server.base_url(),
		Arc::new(MemoryStore::default()),
		acquirer.clone(),
	));
	let client = ApiClient::new(dispatcher.clone());

	for _ in 0..2 {
		client.get(APP_API, "api/hello").await.expect("APINoGraph call should succeed.");
	}

	assert_eq!(acquirer.calls(), 1);
	assert_eq!(dispatcher.metrics().acquisitions(), 1);
	assert_eq!(dispatcher.metrics().cache_hits(), 1);

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn consent_signal_carries_descriptor_scopes_and_sends_nothing() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.path("/api/profile/mobile-greeting");
			then.status(200).body("unreachable");
		})
		.await;
	let store = Arc::new(MemoryStore::default());
	let acquirer = ScriptedAcquirer::new(Script::Consent);
	let dispatcher = Arc::new(dispatcher(&server.base_url(), store.clone(), acquirer.clone()));
	let client = ApiClient::for_principal(dispatcher.clone(), principal("user@contoso.com"));
	let err = client
		.get(USER_API, "api/profile/mobile-greeting")
		.await
		.expect_err("Missing consent must surface as an error.");
	let signal = err.consent_required().expect("Error should carry the consent signal.");

	assert_eq!(signal.scopes, ScopeSet::new([USER_SCOPE]).expect("Scope fixture should be valid."));
	assert_eq!(acquirer.calls(), 1);
	assert!(store.is_empty());
	assert_eq!(dispatcher.metrics().consent_required(), 1);

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn expired_entry_is_reacquired_and_overwritten() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/hello").header("authorization", "Bearer fresh-1");
			then.status(200).body("Hello from APINoGraph.");
		})
		.await;
	let store = Arc::new(MemoryStore::default());
	let key = app_key();

	store
		.put(&key, CachedToken::new("stale", OffsetDateTime::now_utc() - Duration::seconds(1)))
		.await
		.expect("Seeding the cache should succeed.");

	let acquirer = ScriptedAcquirer::issuing("fresh");
	let client =
		ApiClient::new(Arc::new(dispatcher(&server.base_url(), store.clone(), acquirer.clone())));

	client.get(APP_API, "api/hello").await.expect("APINoGraph call should succeed.");

	let cached = store
		.get(&key)
		.await
		.expect("Cache read should succeed.")
		.expect("Cache entry should exist.");

	assert_eq!(cached.value.expose(), "fresh-1");
	assert_eq!(acquirer.calls(), 1);
	assert_eq!(store.len(), 1);

	mock.assert_async().await;
}

#[tokio::test]
async fn token_inside_safety_margin_is_replaced() {
	let server = MockServer::start_async().await;
	let store = Arc::new(MemoryStore::default());

	store
		.put(
			&app_key(),
			CachedToken::new("nearly-expired", OffsetDateTime::now_utc() + Duration::seconds(60)),
		)
		.await
		.expect("Seeding the cache should succeed.");

	let acquirer = ScriptedAcquirer::issuing("fresh");
	let dispatcher = dispatcher(&server.base_url(), store, acquirer.clone());
	let token = dispatcher.bearer_token(APP_API, None).await.expect("Token should resolve.");

	assert_eq!(token.expose(), "fresh-1");

	let relaxed = dispatcher.with_safety_margin(Duration::ZERO);
	let token = relaxed.bearer_token(APP_API, None).await.expect("Token should resolve.");

	assert_eq!(token.expose(), "fresh-1");
	assert_eq!(acquirer.calls(), 1);
}

#[tokio::test]
async fn unknown_api_fails_before_cache_or_network() {
	let store = Arc::new(MemoryStore::default());
	let acquirer = ScriptedAcquirer::issuing("app");
	let client = ApiClient::new(Arc::new(dispatcher(
		"http://127.0.0.1:9/",
		store.clone(),
		acquirer.clone(),
	)));
	let err = client
		.call_api("DoesNotExist", Method::GET, "api/hello")
		.await
		.expect_err("Unknown API must fail.");

	assert!(matches!(
		err,
		Error::Config(ConfigError::UnknownApi { ref name }) if name == "DoesNotExist"
	));
	assert_eq!(acquirer.calls(), 0);
	assert!(store.is_empty());
}

#[tokio::test]
async fn non_success_status_is_reported_with_body() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/hello");
			then.status(403).body("Insufficient privileges.");
		})
		.await;

	let dispatcher = Arc::new(dispatcher(
		&server.base_url(),
		Arc::new(MemoryStore::default()),
		ScriptedAcquirer::issuing("app"),
	));
	let response = dispatcher
		.dispatch(APP_API, None, OutboundRequest::get("api/hello"))
		.await
		.expect("Dispatch should relay non-success responses.");

	assert_eq!(response.status().as_u16(), 403);

	let err = ApiClient::new(dispatcher)
		.get(APP_API, "/api/hello")
		.await
		.expect_err("Non-success status must become an error.");

	match err {
		Error::Downstream(DownstreamCallError::Status { status, reason, body, .. }) => {
			assert_eq!(status, 403);
			assert_eq!(reason, Some("Forbidden"));
			assert_eq!(body, "Insufficient privileges.");
		},
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[tokio::test]
async fn method_body_and_headers_are_preserved() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/items")
				.query_param("dry-run", "true")
				.header("x-correlation-id", "abc-123")
				.header("authorization", "Bearer app-1")
				.body("{\"name\":\"widget\"}");
			then.status(201).body("created");
		})
		.await;
	let dispatcher = dispatcher(
		&server.base_url(),
		Arc::new(MemoryStore::default()),
		ScriptedAcquirer::issuing("app"),
	);
	let request = OutboundRequest::new(Method::POST, "api/items?dry-run=true")
		.header(HeaderName::from_static("x-correlation-id"), HeaderValue::from_static("abc-123"))
		.header(AUTHORIZATION, HeaderValue::from_static("Bearer caller-supplied"))
		.body("{\"name\":\"widget\"}");
	let response =
		dispatcher.dispatch(APP_API, None, request).await.expect("Dispatch should succeed.");

	assert_eq!(response.status().as_u16(), 201);

	mock.assert_async().await;
}

#[tokio::test]
async fn paths_leaving_the_base_address_never_receive_a_token() {
	let server = MockServer::start_async().await;
	let foreign = MockServer::start_async().await;
	let foreign_mock = foreign
		.mock_async(|when, then| {
			when.path("/steal");
			then.status(200).body("stolen");
		})
		.await;
	let acquirer = ScriptedAcquirer::issuing("app");
	let client = ApiClient::new(Arc::new(dispatcher(
		&server.base_url(),
		Arc::new(MemoryStore::default()),
		acquirer.clone(),
	)));

	for path in [
		format!("http://{}/steal", foreign.address()),
		format!("//{}/steal", foreign.address()),
	] {
		let err = client.get(APP_API, &path).await.expect_err("Foreign target must be rejected.");

		assert!(
			matches!(err, Error::Config(ConfigError::InvalidRelativePath { .. })),
			"Unexpected error for {path}: {err:?}"
		);
	}

	assert_eq!(acquirer.calls(), 0);

	foreign_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn stalled_downstream_call_times_out_as_transport_error() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/hello");
			then.status(200).delay(std::time::Duration::from_millis(500)).body("late");
		})
		.await;

	let dispatcher = dispatcher(
		&server.base_url(),
		Arc::new(MemoryStore::default()),
		ScriptedAcquirer::issuing("app"),
	)
	.with_request_timeout(Duration::milliseconds(50));
	let err = dispatcher
		.dispatch(APP_API, None, OutboundRequest::get("api/hello"))
		.await
		.expect_err("Stalled downstream call must time out.");

	match err {
		Error::Downstream(DownstreamCallError::Transport { api, source }) => {
			assert_eq!(api, APP_API);
			assert!(source.is_timeout());
		},
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[tokio::test]
async fn authorize_sets_header_on_foreign_requests() {
	let dispatcher = dispatcher(
		"http://127.0.0.1:9/",
		Arc::new(MemoryStore::default()),
		ScriptedAcquirer::issuing("app"),
	);
	let mut request = reqwest::Request::new(
		Method::GET,
		"http://127.0.0.1:9/api/hello".parse().expect("URL should parse."),
	);

	dispatcher
		.authorize(APP_API, None, &mut request)
		.await
		.expect("Authorization should succeed.");

	assert_eq!(
		request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok()),
		Some("Bearer app-1")
	);
}

#[tokio::test]
async fn delegated_calls_need_a_principal_and_partition_by_user() {
	let acquirer = ScriptedAcquirer::issuing("user");
	let dispatcher =
		dispatcher("http://127.0.0.1:9/", Arc::new(MemoryStore::default()), acquirer.clone());
	let err = dispatcher
		.bearer_token(USER_API, None)
		.await
		.expect_err("Delegated API without principal must fail.");

	assert!(matches!(err, Error::TokenAcquisition(AcquisitionError::MissingPrincipal { .. })));
	assert_eq!(acquirer.calls(), 0);

	let alice = principal("alice@contoso.com");
	let bob = principal("bob@contoso.com");
	let first =
		dispatcher.bearer_token(USER_API, Some(&alice)).await.expect("Alice should resolve.");
	let again =
		dispatcher.bearer_token(USER_API, Some(&alice)).await.expect("Alice should resolve.");
	let other = dispatcher.bearer_token(USER_API, Some(&bob)).await.expect("Bob should resolve.");

	assert_eq!(first, again);
	assert_ne!(first, other);
	assert_eq!(acquirer.calls(), 2);
	assert_eq!(acquirer.requests()[1].principal.as_ref(), Some(&bob));
}

#[tokio::test]
async fn app_only_tokens_are_shared_across_principals() {
	let acquirer = ScriptedAcquirer::issuing("app");
	let dispatcher =
		dispatcher("http://127.0.0.1:9/", Arc::new(MemoryStore::default()), acquirer.clone());
	let anonymous = dispatcher.bearer_token(APP_API, None).await.expect("Token should resolve.");
	let signed_in = dispatcher
		.bearer_token(APP_API, Some(&principal("alice@contoso.com")))
		.await
		.expect("Token should resolve.");

	assert_eq!(anonymous, signed_in);
	assert_eq!(acquirer.calls(), 1);
}

#[tokio::test]
async fn acquisition_failures_are_not_cached_or_sent() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.path("/api/hello");
			then.status(200);
		})
		.await;
	let store = Arc::new(MemoryStore::default());
	let acquirer = ScriptedAcquirer::new(Script::Reject);
	let dispatcher = dispatcher(&server.base_url(), store.clone(), acquirer.clone());
	let err = dispatcher
		.dispatch(APP_API, None, OutboundRequest::get("api/hello"))
		.await
		.expect_err("Rejected acquisition must fail.");

	assert!(matches!(
		err,
		Error::TokenAcquisition(AcquisitionError::Rejected { status: Some(401), .. })
	));
	assert!(store.is_empty());
	assert_eq!(dispatcher.metrics().failures(), 1);

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn slow_acquisition_times_out() {
	let acquirer = ScriptedAcquirer::new(Script::Slow(std::time::Duration::from_millis(500)));
	let dispatcher =
		dispatcher("http://127.0.0.1:9/", Arc::new(MemoryStore::default()), acquirer.clone())
			.with_acquire_timeout(Duration::milliseconds(50));
	let err = dispatcher
		.bearer_token(APP_API, None)
		.await
		.expect_err("Slow acquisition must time out.");

	assert!(matches!(err, Error::TokenAcquisition(AcquisitionError::TimedOut { .. })));
}

#[tokio::test]
async fn cache_faults_do_not_fail_dispatches() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/hello");
			then.status(200).body("Hello from APINoGraph.");
		})
		.await;
	let acquirer = ScriptedAcquirer::issuing("app");
	let client = ApiClient::new(Arc::new(dispatcher(
		&server.base_url(),
		Arc::new(BrokenStore),
		acquirer.clone(),
	)));

	for _ in 0..2 {
		assert_eq!(
			client.get(APP_API, "api/hello").await.expect("Call should succeed."),
			"Hello from APINoGraph."
		);
	}

	assert_eq!(acquirer.calls(), 2);

	mock.assert_calls_async(2).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_dispatches_on_an_expired_key_leave_one_whole_token() {
	let store = Arc::new(MemoryStore::default());

	store
		.put(
			&app_key(),
			CachedToken::new("stale", OffsetDateTime::now_utc() - Duration::seconds(1)),
		)
		.await
		.expect("Seeding the cache should succeed.");

	let acquirer = ScriptedAcquirer::issuing("race");
	let dispatcher = Arc::new(dispatcher("http://127.0.0.1:9/", store.clone(), acquirer.clone()));
	let handles = (0..16)
		.map(|_| {
			let dispatcher = dispatcher.clone();

			tokio::spawn(async move { dispatcher.bearer_token(APP_API, None).await })
		})
		.collect::<Vec<_>>();
	let mut returned = Vec::new();

	for handle in handles {
		let token = handle
			.await
			.expect("Dispatch task should not panic.")
			.expect("Every racing dispatch should resolve a token.");

		returned.push(token.expose().to_owned());
	}

	let issued = (1..=acquirer.calls()).map(|call| format!("race-{call}")).collect::<Vec<_>>();
	let cached = store
		.get(&app_key())
		.await
		.expect("Cache read should succeed.")
		.expect("Cache entry should exist.");

	assert!((1..=16).contains(&acquirer.calls()));
	assert_eq!(store.len(), 1);
	assert!(issued.iter().any(|token| token == cached.value.expose()));
	assert!(cached.expires_at > OffsetDateTime::now_utc());
	assert!(returned.iter().all(|token| issued.contains(token)));
}
