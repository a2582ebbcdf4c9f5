//! The outbound request dispatcher.
//!
//! One resolution routine backs three integration points:
//!
//! - [`Dispatcher::dispatch`] resolves the descriptor, attaches a bearer token, and sends the
//!   request.
//! - [`Dispatcher::authorize`] attaches the token to a request built elsewhere (transport
//!   interceptor style).
//! - [`Dispatcher::bearer_token`] only returns the token.
//!
//! Token resolution reads the cache first and only calls the acquisition provider when the
//! cached entry is missing or would expire within the safety margin. Each acquisition writes at
//! most one cache entry. Cache faults never fail a dispatch: a failed read counts as a miss and
//! a failed write is logged.

mod metrics;
mod request;

pub use metrics::*;
pub use request::*;

// crates.io
use reqwest::{
	Request, Response,
	header::{AUTHORIZATION, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	acquire::{Acquisition, AcquisitionRequest, TokenAcquirer},
	api::{ApiRegistry, DownstreamApiDescriptor},
	auth::{PrincipalId, TokenSecret},
	error::{AcquisitionError, ConsentRequired, DownstreamCallError},
	obs::{self, DispatchOutcome, DispatchSpan, TokenSource},
	store::{TokenCacheKey, TokenCacheStore},
};

/// Dispatcher that injects cached or freshly acquired bearer tokens into outbound requests.
#[derive(Clone)]
pub struct Dispatcher {
	registry: Arc<ApiRegistry>,
	store: Arc<dyn TokenCacheStore>,
	acquirer: Arc<dyn TokenAcquirer>,
	http_client: ReqwestClient,
	safety_margin: Duration,
	acquire_timeout: Duration,
	request_timeout: Duration,
	metrics: Arc<DispatchMetrics>,
}
impl Dispatcher {
	/// Default window before expiry in which cached tokens are replaced.
	pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::minutes(2);
	/// Default bound on a single acquisition.
	pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::seconds(30);
	/// Default bound on a single downstream call, from connect to the last response byte.
	pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(100);

	/// Creates a dispatcher with default margins and a default reqwest client.
	pub fn new(
		registry: Arc<ApiRegistry>,
		store: Arc<dyn TokenCacheStore>,
		acquirer: Arc<dyn TokenAcquirer>,
	) -> Self {
		Self {
			registry,
			store,
			acquirer,
			http_client: ReqwestClient::default(),
			safety_margin: Self::DEFAULT_SAFETY_MARGIN,
			acquire_timeout: Self::DEFAULT_ACQUIRE_TIMEOUT,
			request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
			metrics: Default::default(),
		}
	}

	/// Replaces the client used for downstream calls.
	pub fn with_http_client(mut self, http_client: ReqwestClient) -> Self {
		self.http_client = http_client;

		self
	}

	/// Overrides the expiry safety margin.
	pub fn with_safety_margin(mut self, safety_margin: Duration) -> Self {
		self.safety_margin = safety_margin;

		self
	}

	/// Overrides the acquisition timeout.
	pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
		self.acquire_timeout = acquire_timeout;

		self
	}

	/// Overrides the downstream request timeout.
	///
	/// Applied per request, so it also bounds calls made through a client passed to
	/// [`with_http_client`](Self::with_http_client).
	pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
		self.request_timeout = request_timeout;

		self
	}

	/// Registry the dispatcher resolves API names against.
	pub fn registry(&self) -> &ApiRegistry {
		&self.registry
	}

	/// Counters shared by every clone of this dispatcher.
	pub fn metrics(&self) -> &DispatchMetrics {
		&self.metrics
	}

	/// Resolves a bearer token for `api` without sending anything.
	pub async fn bearer_token(
		&self,
		api: &str,
		principal: Option<&PrincipalId>,
	) -> Result<TokenSecret> {
		let descriptor = self.registry.resolve(api)?;

		self.token_for(descriptor, principal).await
	}

	/// Sets `Authorization: Bearer <token>` on a request built outside the broker.
	///
	/// Any existing `Authorization` header is replaced; everything else is left untouched.
	pub async fn authorize(
		&self,
		api: &str,
		principal: Option<&PrincipalId>,
		request: &mut Request,
	) -> Result<()> {
		let token = self.bearer_token(api, principal).await?;

		request.headers_mut().insert(AUTHORIZATION, authorization_value(&token)?);

		Ok(())
	}

	/// Sends `request` to `api` with a bearer token attached.
	///
	/// The downstream response is returned as-is, including non-success statuses.
	pub async fn dispatch(
		&self,
		api: &str,
		principal: Option<&PrincipalId>,
		request: OutboundRequest,
	) -> Result<Response> {
		let descriptor = self.registry.resolve(api)?;
		let url = descriptor.resolve(&request.path)?;
		let token = self.token_for(descriptor, principal).await?;
		let mut headers = request.headers;

		headers.insert(AUTHORIZATION, authorization_value(&token)?);

		let mut builder = self
			.http_client
			.request(request.method, url)
			.headers(headers)
			.timeout(self.request_timeout.unsigned_abs());

		if let Some(body) = request.body {
			builder = builder.body(body);
		}

		builder.send().await.map_err(|source| {
			DownstreamCallError::Transport { api: descriptor.name.to_string(), source }.into()
		})
	}

	async fn token_for(
		&self,
		descriptor: &DownstreamApiDescriptor,
		principal: Option<&PrincipalId>,
	) -> Result<TokenSecret> {
		let grant = descriptor.grant;
		let span = DispatchSpan::new(descriptor.name.as_str(), grant);

		obs::record_dispatch_outcome(grant, DispatchOutcome::Attempt);

		let result = span.instrument(self.resolve_token(descriptor, principal)).await;

		match &result {
			Ok(_) => obs::record_dispatch_outcome(grant, DispatchOutcome::Success),
			Err(Error::ConsentRequired(_)) => {
				self.metrics.record_consent_required();
				obs::record_dispatch_outcome(grant, DispatchOutcome::ConsentRequired);
			},
			Err(_) => {
				self.metrics.record_failure();
				obs::record_dispatch_outcome(grant, DispatchOutcome::Failure);
			},
		}

		result
	}

	async fn resolve_token(
		&self,
		descriptor: &DownstreamApiDescriptor,
		principal: Option<&PrincipalId>,
	) -> Result<TokenSecret> {
		let grant = descriptor.grant;
		let principal = if grant.requires_principal() {
			Some(principal.cloned().ok_or_else(|| AcquisitionError::MissingPrincipal {
				api: descriptor.name.to_string(),
			})?)
		} else {
			None
		};
		let key = TokenCacheKey::new(grant, descriptor.scopes.clone(), principal);

		if let Some(token) = self.cached(&key).await {
			self.metrics.record_cache_hit();
			obs::record_token_source(grant, TokenSource::Cache);
			obs::log_token_source(TokenSource::Cache);

			return Ok(token);
		}

		let request = AcquisitionRequest {
			scopes: key.scopes.clone(),
			grant,
			principal: key.principal.clone(),
		};

		self.metrics.record_acquisition();

		let bound = self.acquire_timeout.unsigned_abs();
		let acquisition = tokio::time::timeout(bound, self.acquirer.acquire(&request))
			.await
			.unwrap_or_else(|_| {
				Acquisition::Failed(AcquisitionError::TimedOut { after: self.acquire_timeout })
			});

		match acquisition {
			Acquisition::Acquired(token) => {
				let value = token.value.clone();

				if let Err(e) = self.store.put(&key, token).await {
					obs::log_store_fault("put", &e);
				}

				obs::record_token_source(grant, TokenSource::Provider);
				obs::log_token_source(TokenSource::Provider);

				Ok(value)
			},
			Acquisition::ConsentRequired(_) => {
				obs::log_consent_required(&descriptor.scopes.normalized());

				Err(ConsentRequired::new(descriptor.scopes.clone()).into())
			},
			Acquisition::Failed(e) => {
				obs::log_acquisition_failure(&e);

				Err(e.into())
			},
		}
	}

	async fn cached(&self, key: &TokenCacheKey) -> Option<TokenSecret> {
		match self.store.get(key).await {
			Ok(Some(token)) if token.is_fresh_at(OffsetDateTime::now_utc(), self.safety_margin) =>
				Some(token.value),
			Ok(_) => None,
			Err(e) => {
				obs::log_store_fault("get", &e);

				None
			},
		}
	}
}
impl Debug for Dispatcher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher")
			.field("apis", &self.registry.len())
			.field("safety_margin", &self.safety_margin)
			.field("acquire_timeout", &self.acquire_timeout)
			.field("request_timeout", &self.request_timeout)
			.finish_non_exhaustive()
	}
}

fn authorization_value(token: &TokenSecret) -> Result<HeaderValue, AcquisitionError> {
	let mut value = HeaderValue::from_str(&token.bearer_header()).map_err(|_| {
		AcquisitionError::InvalidResponse { reason: "access token is not a valid header value" }
	})?;

	value.set_sensitive(true);

	Ok(value)
}
