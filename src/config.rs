//! JSON configuration document and the wiring helpers built on top of it.
//!
//! The document uses the PascalCase layout common to `appsettings.json` files:
//!
//! ```json
//! {
//!   "DownstreamApis": {
//!     "APINoGraph": {
//!       "BaseUrl": "https://localhost:7001/",
//!       "Scopes": ["api://x/.default"],
//!       "RequestAppToken": true
//!     }
//!   },
//!   "Identity": {
//!     "TokenEndpoint": "https://login.example.com/tenant/oauth2/v2.0/token",
//!     "ClientId": "client",
//!     "ClientSecret": "secret"
//!   },
//!   "TokenCache": { "SafetyMarginSeconds": 120 },
//!   "Http": { "TimeoutSeconds": 100, "AcquireTimeoutSeconds": 30 }
//! }
//! ```
//!
//! Unknown sections are ignored so the broker can share a file with the host application.

// std
use std::{fs, path::Path};
// self
use crate::{
	_prelude::*,
	acquire::{ClientAuthMethod, OAuthAcquirer, TokenAcquirer, UserGrantSource},
	api::{ApiRegistry, DownstreamApiDescriptor, GrantKind},
	auth::ApiName,
	consent::ConsentRedirect,
	dispatch::Dispatcher,
	error::ConfigError,
	http::ReqwestHttpClient,
	store::{MemoryStore, TokenCacheStore},
};

/// Root configuration document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BrokerConfig {
	/// Downstream APIs keyed by logical name.
	#[serde(default)]
	pub downstream_apis: BTreeMap<String, DownstreamApiSettings>,
	/// Identity provider client registration.
	#[serde(default)]
	pub identity: Option<IdentitySettings>,
	/// Token cache policy and backend.
	#[serde(default)]
	pub token_cache: TokenCacheSettings,
	/// Outbound HTTP bounds.
	#[serde(default)]
	pub http: HttpSettings,
}
impl BrokerConfig {
	/// Parses a configuration document, reporting the JSON path of any malformed value.
	pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(document);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::Parse { source })
	}

	/// Reads and parses a configuration file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let document = fs::read_to_string(path)
			.map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;

		Self::from_json_str(&document)
	}

	/// Builds the descriptor registry from `DownstreamApis`.
	pub fn registry(&self) -> Result<ApiRegistry, ConfigError> {
		let descriptors = self
			.downstream_apis
			.iter()
			.map(|(name, settings)| settings.descriptor(name))
			.collect::<Result<Vec<_>, _>>()?;

		ApiRegistry::new(descriptors)
	}

	/// Builds the client used for downstream calls, bounded by `Http.TimeoutSeconds`.
	pub fn http_client(&self) -> Result<ReqwestClient, ConfigError> {
		ReqwestClient::builder()
			.timeout(self.http.timeout())
			.build()
			.map_err(|source| ConfigError::HttpClientBuild { source })
	}

	/// Builds the OAuth acquirer from `Identity`.
	///
	/// Delegated APIs additionally need `user_grants`; without it their acquisitions fail with
	/// a missing-grant error.
	pub fn acquirer(
		&self,
		user_grants: Option<Arc<dyn UserGrantSource>>,
	) -> Result<OAuthAcquirer, ConfigError> {
		let identity = self.identity()?;
		let token_endpoint = parse_url("Identity.TokenEndpoint", &identity.token_endpoint)?;
		let mut acquirer = OAuthAcquirer::new(&token_endpoint, identity.client_id.clone())?
			.with_http_client(ReqwestHttpClient::new(Some(self.http.timeout()))?);

		if let Some(secret) = &identity.client_secret {
			acquirer = acquirer.with_client_secret(secret.clone(), identity.client_auth_method);
		}
		if let Some(user_grants) = user_grants {
			acquirer = acquirer.with_user_grants(user_grants);
		}

		Ok(acquirer)
	}

	/// Builds consent redirect parameters when both `Identity.AuthorizationEndpoint` and
	/// `Identity.RedirectUri` are configured.
	pub fn consent_redirect(&self) -> Result<Option<ConsentRedirect>, ConfigError> {
		let identity = self.identity()?;
		let (Some(endpoint), Some(redirect_uri)) =
			(&identity.authorization_endpoint, &identity.redirect_uri)
		else {
			return Ok(None);
		};

		Ok(Some(ConsentRedirect::new(
			parse_url("Identity.AuthorizationEndpoint", endpoint)?,
			identity.client_id.clone(),
			parse_url("Identity.RedirectUri", redirect_uri)?,
		)))
	}

	/// Opens the configured token cache: Redis when `TokenCache.RedisUrl` is set, otherwise an
	/// in-process [`MemoryStore`].
	pub async fn cache_store(&self) -> Result<Arc<dyn TokenCacheStore>, ConfigError> {
		let Some(redis_url) = &self.token_cache.redis_url else {
			return Ok(Arc::new(MemoryStore::default()));
		};

		#[cfg(feature = "redis")]
		{
			let mut store = crate::store::RedisStore::connect(redis_url).await?;

			if let Some(prefix) = &self.token_cache.key_prefix {
				store = store.with_prefix(prefix.clone());
			}

			Ok(Arc::new(store))
		}
		#[cfg(not(feature = "redis"))]
		{
			let _ = redis_url;

			Err(crate::store::StoreError::Backend {
				message: "Redis support is not enabled in this build".into(),
			}
			.into())
		}
	}

	/// Wires a dispatcher from this document and the provided cache and acquirer.
	pub fn dispatcher(
		&self,
		store: Arc<dyn TokenCacheStore>,
		acquirer: Arc<dyn TokenAcquirer>,
	) -> Result<Dispatcher, ConfigError> {
		Ok(Dispatcher::new(Arc::new(self.registry()?), store, acquirer)
			.with_http_client(self.http_client()?)
			.with_safety_margin(Duration::seconds(self.token_cache.safety_margin_seconds.into()))
			.with_acquire_timeout(Duration::seconds(self.http.acquire_timeout_seconds.into()))
			.with_request_timeout(Duration::seconds(self.http.timeout_seconds.into())))
	}

	fn identity(&self) -> Result<&IdentitySettings, ConfigError> {
		self.identity.as_ref().ok_or(ConfigError::MissingSection { section: "Identity" })
	}
}

/// One entry of `DownstreamApis`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DownstreamApiSettings {
	/// Absolute base address.
	pub base_url: Option<String>,
	/// Scopes requested for this API; a JSON array or a space-separated string.
	#[serde(default)]
	pub scopes: ScopeList,
	/// `true` for app-only tokens, `false` (default) for delegated tokens.
	#[serde(default)]
	pub request_app_token: bool,
}
impl DownstreamApiSettings {
	/// Validates the entry into a descriptor named `name`.
	pub fn descriptor(&self, name: &str) -> Result<DownstreamApiDescriptor, ConfigError> {
		let api = ApiName::new(name)?;
		let grant =
			if self.request_app_token { GrantKind::AppOnly } else { GrantKind::DelegatedUser };
		let mut builder =
			DownstreamApiDescriptor::builder(api).grant(grant).scopes(self.scopes.values());

		if let Some(base_url) = &self.base_url {
			builder = builder.base_address(parse_url("DownstreamApis.BaseUrl", base_url)?);
		}

		builder
			.build()
			.map_err(|source| ConfigError::InvalidDescriptor { name: name.to_owned(), source })
	}
}

/// Scope list accepted in either array or space-separated form.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ScopeList {
	/// `"User.Read offline_access"`.
	Joined(String),
	/// `["User.Read", "offline_access"]`.
	List(Vec<String>),
}
impl ScopeList {
	/// Individual scope values.
	pub fn values(&self) -> Vec<String> {
		match self {
			Self::Joined(joined) => joined.split_whitespace().map(str::to_owned).collect(),
			Self::List(list) => list.clone(),
		}
	}
}
impl Default for ScopeList {
	fn default() -> Self {
		Self::List(Vec::new())
	}
}

/// `Identity` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IdentitySettings {
	/// OAuth 2.0 token endpoint.
	pub token_endpoint: String,
	/// Authorization endpoint used for consent redirects.
	#[serde(default)]
	pub authorization_endpoint: Option<String>,
	/// Where the identity provider returns the user after consent.
	#[serde(default)]
	pub redirect_uri: Option<String>,
	/// OAuth client identifier.
	pub client_id: String,
	/// Client secret for confidential clients.
	#[serde(default)]
	pub client_secret: Option<String>,
	/// Client authentication method (`client_secret_basic` or `client_secret_post`).
	#[serde(default)]
	pub client_auth_method: ClientAuthMethod,
}

/// `TokenCache` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TokenCacheSettings {
	/// Seconds before expiry at which cached tokens are replaced.
	pub safety_margin_seconds: u32,
	/// Redis/Valkey connection string; absent means in-process caching.
	pub redis_url: Option<String>,
	/// Key prefix for Redis entries.
	pub key_prefix: Option<String>,
}
impl Default for TokenCacheSettings {
	fn default() -> Self {
		Self { safety_margin_seconds: 120, redis_url: None, key_prefix: None }
	}
}

/// `Http` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct HttpSettings {
	/// Overall timeout for each downstream and token endpoint request.
	pub timeout_seconds: u32,
	/// Bound on a single token acquisition.
	pub acquire_timeout_seconds: u32,
}
impl HttpSettings {
	fn timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.timeout_seconds.into())
	}
}
impl Default for HttpSettings {
	fn default() -> Self {
		Self { timeout_seconds: 100, acquire_timeout_seconds: 30 }
	}
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
	Url::parse(value).map_err(|source| ConfigError::InvalidUrl { field, source })
}
