//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
// self
use downstream_broker::{
	acquire::{AcquireFuture, Acquisition, AcquisitionRequest, TokenAcquirer},
	api::{ApiRegistry, DownstreamApiDescriptor, GrantKind},
	auth::{ApiName, CachedToken, PrincipalId},
	dispatch::Dispatcher,
	error::AcquisitionError,
	store::{StoreError, StoreFuture, TokenCacheKey, TokenCacheStore},
	url::Url,
};

pub const APP_API: &str = "APINoGraph";
pub const USER_API: &str = "APIWithGraph";
pub const APP_SCOPE: &str = "api://x/.default";
pub const USER_SCOPE: &str = "User.Read";

/// What a [`ScriptedAcquirer`] answers with.
#[derive(Clone, Debug)]
pub enum Script {
	/// Issues `<prefix>-<call number>` valid for `lifetime`.
	Issue { prefix: &'static str, lifetime: Duration },
	/// Signals missing consent.
	Consent,
	/// Fails with a rejection.
	Reject,
	/// Sleeps before issuing, to exercise the acquisition timeout.
	Slow(std::time::Duration),
}

/// Acquirer double that records every request it receives.
#[derive(Debug)]
pub struct ScriptedAcquirer {
	script: Script,
	calls: AtomicUsize,
	requests: Mutex<Vec<AcquisitionRequest>>,
}
impl ScriptedAcquirer {
	pub fn new(script: Script) -> Arc<Self> {
		Arc::new(Self { script, calls: AtomicUsize::new(0), requests: Mutex::new(Vec::new()) })
	}

	pub fn issuing(prefix: &'static str) -> Arc<Self> {
		Self::new(Script::Issue { prefix, lifetime: Duration::hours(1) })
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn requests(&self) -> Vec<AcquisitionRequest> {
		self.requests.lock().clone()
	}
}
impl TokenAcquirer for ScriptedAcquirer {
	fn acquire<'a>(&'a self, request: &'a AcquisitionRequest) -> AcquireFuture<'a> {
		Box::pin(async move {
			let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

			self.requests.lock().push(request.clone());

			match &self.script {
				Script::Issue { prefix, lifetime } => Acquisition::Acquired(CachedToken::issued_at(
					format!("{prefix}-{call}"),
					OffsetDateTime::now_utc(),
					*lifetime,
				)),
				Script::Consent => Acquisition::ConsentRequired(request.scopes.clone()),
				Script::Reject => Acquisition::Failed(AcquisitionError::Rejected {
					reason: "invalid_client".into(),
					status: Some(401),
				}),
				Script::Slow(delay) => {
					tokio::time::sleep(*delay).await;

					Acquisition::Acquired(CachedToken::issued_at(
						format!("slow-{call}"),
						OffsetDateTime::now_utc(),
						Duration::hours(1),
					))
				},
			}
		})
	}
}

/// Store whose every operation fails, to exercise cache fault tolerance.
#[derive(Debug, Default)]
pub struct BrokenStore;
impl TokenCacheStore for BrokenStore {
	fn get<'a>(&'a self, _key: &'a TokenCacheKey) -> StoreFuture<'a, Option<CachedToken>> {
		Box::pin(async { Err(StoreError::Backend { message: "connection refused".into() }) })
	}

	fn put<'a>(&'a self, _key: &'a TokenCacheKey, _token: CachedToken) -> StoreFuture<'a, ()> {
		Box::pin(async { Err(StoreError::Backend { message: "connection refused".into() }) })
	}
}

pub fn descriptor(
	name: &str,
	base: &str,
	scope: &str,
	grant: GrantKind,
) -> DownstreamApiDescriptor {
	DownstreamApiDescriptor::builder(ApiName::new(name).expect("API name fixture should be valid."))
		.base_address(Url::parse(base).expect("Base address fixture should parse."))
		.scope(scope)
		.grant(grant)
		.build()
		.expect("Descriptor fixture should build.")
}

/// Registry with `APINoGraph` (app-only) and `APIWithGraph` (delegated) pointing at `base`.
pub fn registry(base: &str) -> Arc<ApiRegistry> {
	Arc::new(
		ApiRegistry::new([
			descriptor(APP_API, base, APP_SCOPE, GrantKind::AppOnly),
			descriptor(USER_API, base, USER_SCOPE, GrantKind::DelegatedUser),
		])
		.expect("Registry fixture should build."),
	)
}

pub fn dispatcher(
	base: &str,
	store: Arc<dyn TokenCacheStore>,
	acquirer: Arc<dyn TokenAcquirer>,
) -> Dispatcher {
	Dispatcher::new(registry(base), store, acquirer)
}

pub fn principal(value: &str) -> PrincipalId {
	PrincipalId::new(value).expect("Principal fixture should be valid.")
}
