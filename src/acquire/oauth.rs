//! [`TokenAcquirer`] backed by the `oauth2` crate.
//!
//! App-only requests run the `client_credentials` grant; delegated requests redeem the
//! principal's refresh token from a [`UserGrantSource`] with the `refresh_token` grant and write
//! back any rotated refresh token the provider returns.

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError, RefreshToken,
	RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	acquire::{
		AcquireFuture, Acquisition, AcquisitionRequest, AcquisitionStrategy,
		DefaultAcquisitionStrategy, TokenAcquirer, TokenErrorContext, TokenErrorKind,
		UserGrantSource,
	},
	api::GrantKind,
	auth::{CachedToken, PrincipalId, ScopeSet, TokenSecret},
	error::{AcquisitionError, ConfigError},
	http::{ReqwestHttpClient, ResponseMetadataSlot},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// How the client authenticates to the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// HTTP Basic authentication with the client id and secret.
	#[default]
	ClientSecretBasic,
	/// Client id and secret sent in the form body.
	ClientSecretPost,
}

/// Acquirer that talks to an OAuth 2.0 token endpoint.
pub struct OAuthAcquirer {
	oauth_client: ConfiguredBasicClient,
	http_client: ReqwestHttpClient,
	strategy: Arc<dyn AcquisitionStrategy>,
	user_grants: Option<Arc<dyn UserGrantSource>>,
}
impl OAuthAcquirer {
	/// Creates an acquirer for a public client; pair with
	/// [`with_client_secret`](Self::with_client_secret) for confidential clients.
	pub fn new(token_endpoint: &Url, client_id: impl Into<String>) -> Result<Self, ConfigError> {
		let token_url = TokenUrl::new(token_endpoint.to_string())
			.map_err(|source| ConfigError::InvalidUrl { field: "Identity.TokenEndpoint", source })?;
		let oauth_client =
			BasicClient::new(ClientId::new(client_id.into())).set_token_uri(token_url);

		Ok(Self {
			oauth_client,
			http_client: ReqwestHttpClient::new(None)?,
			strategy: Arc::new(DefaultAcquisitionStrategy),
			user_grants: None,
		})
	}

	/// Sets the client secret and the method used to present it.
	pub fn with_client_secret(
		mut self,
		secret: impl Into<String>,
		method: ClientAuthMethod,
	) -> Self {
		let auth_type = match method {
			ClientAuthMethod::ClientSecretBasic => AuthType::BasicAuth,
			ClientAuthMethod::ClientSecretPost => AuthType::RequestBody,
		};

		self.oauth_client = self
			.oauth_client
			.set_client_secret(ClientSecret::new(secret.into()))
			.set_auth_type(auth_type);

		self
	}

	/// Replaces the transport used for token requests.
	pub fn with_http_client(mut self, http_client: ReqwestHttpClient) -> Self {
		self.http_client = http_client;

		self
	}

	/// Replaces the error classification strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn AcquisitionStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Enables delegated acquisitions backed by `user_grants`.
	pub fn with_user_grants(mut self, user_grants: Arc<dyn UserGrantSource>) -> Self {
		self.user_grants = Some(user_grants);

		self
	}

	async fn client_credentials(&self, scopes: &ScopeSet) -> Result<CachedToken, ExchangeFailure> {
		const GRANT: GrantKind = GrantKind::AppOnly;

		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let mut request = self.oauth_client.exchange_client_credentials();

		for scope in scopes.iter() {
			request = request.add_scope(Scope::new(scope.to_owned()));
		}
		for (key, value) in self.extra_params(GRANT) {
			request = request.add_extra_param(key, value);
		}

		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|e| self.map_request_error(GRANT, meta.take_status(), e))?;

		Ok(map_token_response(&response)?)
	}

	async fn delegated(
		&self,
		scopes: &ScopeSet,
		principal: &PrincipalId,
	) -> Result<CachedToken, ExchangeFailure> {
		const GRANT: GrantKind = GrantKind::DelegatedUser;

		let grants = self.user_grants.as_ref().ok_or_else(|| AcquisitionError::MissingUserGrant {
			principal: principal.to_string(),
		})?;
		let refresh = grants.refresh_token(principal).await?.ok_or_else(|| {
			AcquisitionError::MissingUserGrant { principal: principal.to_string() }
		})?;
		let refresh_secret = RefreshToken::new(refresh.expose().to_owned());
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let mut request = self.oauth_client.exchange_refresh_token(&refresh_secret);

		for scope in scopes.iter() {
			request = request.add_scope(Scope::new(scope.to_owned()));
		}
		for (key, value) in self.extra_params(GRANT) {
			request = request.add_extra_param(key, value);
		}

		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|e| self.map_request_error(GRANT, meta.take_status(), e))?;
		let token = map_token_response(&response)?;

		if let Some(rotated) = response.refresh_token()
			&& rotated.secret() != refresh.expose()
		{
			grants
				.store_refresh_token(principal, TokenSecret::new(rotated.secret().to_owned()))
				.await?;
		}

		Ok(token)
	}

	fn extra_params(&self, grant: GrantKind) -> BTreeMap<String, String> {
		let mut form = BTreeMap::new();

		self.strategy.augment_token_request(grant, &mut form);
		form.retain(|key, _| !matches!(key.as_str(), "grant_type" | "scope" | "refresh_token"));

		form
	}

	fn map_request_error(
		&self,
		grant: GrantKind,
		status: Option<u16>,
		err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
	) -> ExchangeFailure {
		match err {
			RequestTokenError::ServerResponse(response) =>
				self.map_server_response(grant, status, &response),
			RequestTokenError::Request(error) => {
				let ctx = TokenErrorContext::network_failure(grant).with_http_status(status);

				match self.strategy.classify_token_error(&ctx) {
					TokenErrorKind::ConsentRequired => ExchangeFailure::ConsentRequired,
					_ => AcquisitionError::network(error).into(),
				}
			},
			RequestTokenError::Parse(source, body) => {
				let ctx = TokenErrorContext::new(grant)
					.with_http_status(status)
					.with_body_preview(String::from_utf8_lossy(&body));

				match self.strategy.classify_token_error(&ctx) {
					TokenErrorKind::ConsentRequired => ExchangeFailure::ConsentRequired,
					TokenErrorKind::Transient => AcquisitionError::Transient {
						message: "Token endpoint returned an unparseable error response".into(),
						status,
					}
					.into(),
					TokenErrorKind::Rejected =>
						AcquisitionError::ResponseParse { source, status }.into(),
				}
			},
			RequestTokenError::Other(message) => {
				let ctx = TokenErrorContext::new(grant)
					.with_http_status(status)
					.with_body_preview(&message);

				self.classified(ctx, message, status)
			},
		}
	}

	fn map_server_response(
		&self,
		grant: GrantKind,
		status: Option<u16>,
		response: &BasicErrorResponse,
	) -> ExchangeFailure {
		let code = response.error().as_ref().to_owned();
		let mut ctx =
			TokenErrorContext::new(grant).with_http_status(status).with_oauth_error(&code);

		if let Some(description) = response.error_description() {
			ctx = ctx.with_error_description(description.to_owned());
		}

		let message = response.error_description().cloned().unwrap_or(code);

		self.classified(ctx, message, status)
	}

	fn classified(
		&self,
		ctx: TokenErrorContext,
		message: String,
		status: Option<u16>,
	) -> ExchangeFailure {
		match self.strategy.classify_token_error(&ctx) {
			TokenErrorKind::ConsentRequired => ExchangeFailure::ConsentRequired,
			TokenErrorKind::Transient => AcquisitionError::Transient { message, status }.into(),
			TokenErrorKind::Rejected =>
				AcquisitionError::Rejected { reason: message, status }.into(),
		}
	}
}
impl Debug for OAuthAcquirer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthAcquirer")
			.field("client_id", self.oauth_client.client_id())
			.field("token_uri", &self.oauth_client.token_uri().as_str())
			.field("user_grants", &self.user_grants.is_some())
			.finish_non_exhaustive()
	}
}
impl TokenAcquirer for OAuthAcquirer {
	fn acquire<'a>(&'a self, request: &'a AcquisitionRequest) -> AcquireFuture<'a> {
		Box::pin(async move {
			let result = match (request.grant, request.principal.as_ref()) {
				(GrantKind::AppOnly, _) => self.client_credentials(&request.scopes).await,
				(GrantKind::DelegatedUser, Some(principal)) =>
					self.delegated(&request.scopes, principal).await,
				(GrantKind::DelegatedUser, None) => Err(AcquisitionError::Rejected {
					reason: "Delegated token requested without a principal".into(),
					status: None,
				}
				.into()),
			};

			match result {
				Ok(token) => Acquisition::Acquired(token),
				Err(ExchangeFailure::ConsentRequired) =>
					Acquisition::ConsentRequired(request.scopes.clone()),
				Err(ExchangeFailure::Failed(e)) => Acquisition::Failed(e),
			}
		})
	}
}

enum ExchangeFailure {
	ConsentRequired,
	Failed(AcquisitionError),
}
impl From<AcquisitionError> for ExchangeFailure {
	fn from(e: AcquisitionError) -> Self {
		Self::Failed(e)
	}
}

fn map_token_response(response: &BasicTokenResponse) -> Result<CachedToken, AcquisitionError> {
	let expires_in = response
		.expires_in()
		.ok_or(AcquisitionError::InvalidResponse { reason: "missing expires_in" })?
		.as_secs();
	let expires_in = i64::try_from(expires_in)
		.map_err(|_| AcquisitionError::InvalidResponse { reason: "expires_in is out of range" })?;

	if expires_in <= 0 {
		return Err(AcquisitionError::InvalidResponse { reason: "expires_in must be positive" });
	}

	Ok(CachedToken::issued_at(
		response.access_token().secret().to_owned(),
		OffsetDateTime::now_utc(),
		Duration::seconds(expires_in),
	))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn token_response(json: &str) -> BasicTokenResponse {
		serde_json::from_str(json).expect("Token response fixture should deserialize.")
	}

	#[test]
	fn token_response_requires_positive_lifetime() {
		let ok = map_token_response(&token_response(
			r#"{"access_token":"at","token_type":"Bearer","expires_in":3600}"#,
		))
		.expect("Valid response should map.");

		assert_eq!(ok.value.expose(), "at");
		assert!(ok.remaining_at(OffsetDateTime::now_utc()) > Duration::minutes(59));
		assert!(matches!(
			map_token_response(&token_response(r#"{"access_token":"at","token_type":"Bearer"}"#)),
			Err(AcquisitionError::InvalidResponse { reason: "missing expires_in" })
		));
		assert!(matches!(
			map_token_response(&token_response(
				r#"{"access_token":"at","token_type":"Bearer","expires_in":0}"#
			)),
			Err(AcquisitionError::InvalidResponse { reason: "expires_in must be positive" })
		));
	}

	#[test]
	fn debug_shows_token_endpoint() {
		let acquirer = OAuthAcquirer::new(
			&Url::parse("https://login.example.com/token").expect("URL should parse."),
			"client",
		)
		.expect("Acquirer should build.");

		assert!(format!("{acquirer:?}").contains("login.example.com"));
	}
}
