//! Calls an app-only API and a delegated API through one dispatcher, then turns a consent signal
//! into the incremental-consent redirect a web front end would issue.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use downstream_broker::{
	acquire::MemoryUserGrants,
	auth::PrincipalId,
	client::ApiClient,
	config::BrokerConfig,
	error::Error,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let identity = MockServer::start_async().await;
	let apis = MockServer::start_async().await;

	identity
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.form_urlencoded_tuple("grant_type", "client_credentials");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"app-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	identity
		.mock_async(|when, then| {
			when.method(POST).path("/token").form_urlencoded_tuple("refresh_token", "refresh-ada");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"ada-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	identity
		.mock_async(|when, then| {
			when.method(POST).path("/token").form_urlencoded_tuple("refresh_token", "refresh-bob");
			then.status(400).header("content-type", "application/json").body(
				"{\"error\":\"invalid_grant\",\"error_description\":\"AADSTS65001: The user has not consented.\"}",
			);
		})
		.await;
	apis.mock_async(|when, then| {
		when.method(GET).path("/api/hello").header("authorization", "Bearer app-token");
		then.status(200).body("Hello from APINoGraph.");
	})
	.await;
	apis.mock_async(|when, then| {
		when.method(GET)
			.path("/api/profile/mobile-greeting")
			.header("authorization", "Bearer ada-token");
		then.status(200).body("Hello Ada Lovelace. Is +1 555 0100 the best number?");
	})
	.await;

	let config = BrokerConfig::from_json_str(&format!(
		r#"{{
			"DownstreamApis": {{
				"APINoGraph": {{ "BaseUrl": "{apis}", "Scopes": ["api://apinograph/.default"], "RequestAppToken": true }},
				"APIWithGraph": {{ "BaseUrl": "{apis}", "Scopes": ["User.Read"] }}
			}},
			"Identity": {{
				"TokenEndpoint": "{token}",
				"AuthorizationEndpoint": "{authorize}",
				"RedirectUri": "https://localhost:7000/api-demo",
				"ClientId": "web-app",
				"ClientSecret": "web-app-secret"
			}}
		}}"#,
		apis = apis.base_url(),
		token = identity.url("/token"),
		authorize = identity.url("/authorize"),
	))?;
	let grants = Arc::new(MemoryUserGrants::default());
	let ada = PrincipalId::new("ada@contoso.com")?;
	let bob = PrincipalId::new("bob@contoso.com")?;

	grants.insert(ada.clone(), "refresh-ada");
	grants.insert(bob.clone(), "refresh-bob");

	let store = config.cache_store().await?;
	let acquirer = Arc::new(config.acquirer(Some(grants))?);
	let dispatcher = Arc::new(config.dispatcher(store, acquirer)?);
	let app_client = ApiClient::new(dispatcher.clone());

	println!("APINoGraph: {}", app_client.get("APINoGraph", "api/hello").await?);

	let ada_client = ApiClient::for_principal(dispatcher.clone(), ada);

	println!(
		"APIWithGraph (ada): {}",
		ada_client.get("APIWithGraph", "api/profile/mobile-greeting").await?
	);

	let bob_client = ApiClient::for_principal(dispatcher.clone(), bob.clone());

	match bob_client.get("APIWithGraph", "api/profile/mobile-greeting").await {
		Err(Error::ConsentRequired(signal)) =>
			if let Some(redirect) = config.consent_redirect()? {
				let challenge = redirect.challenge(&signal, Some(bob.as_str()));

				println!(
					"APIWithGraph (bob): consent required, redirect to {}",
					challenge.authorize_url
				);
			},
		other => println!("APIWithGraph (bob): {other:?}"),
	}

	let metrics = dispatcher.metrics();

	println!(
		"cache hits: {}, acquisitions: {}, consent signals: {}",
		metrics.cache_hits(),
		metrics.acquisitions(),
		metrics.consent_required()
	);

	Ok(())
}
