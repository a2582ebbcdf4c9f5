//! Request-scoped client that returns downstream response bodies as strings.

// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	auth::PrincipalId,
	dispatch::{Dispatcher, OutboundRequest},
	error::DownstreamCallError,
};

/// Thin caller-facing wrapper over a [`Dispatcher`].
///
/// Build one per incoming request: [`ApiClient::new`] when nobody is signed in, or
/// [`ApiClient::for_principal`] to make delegated calls on behalf of the current user.
#[derive(Clone, Debug)]
pub struct ApiClient {
	dispatcher: Arc<Dispatcher>,
	principal: Option<PrincipalId>,
}
impl ApiClient {
	/// Creates a client without a signed-in principal.
	pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
		Self { dispatcher, principal: None }
	}

	/// Creates a client acting on behalf of `principal`.
	pub fn for_principal(dispatcher: Arc<Dispatcher>, principal: PrincipalId) -> Self {
		Self { dispatcher, principal: Some(principal) }
	}

	/// Signed-in principal, if any.
	pub fn principal(&self) -> Option<&PrincipalId> {
		self.principal.as_ref()
	}

	/// Calls `api` and returns the response body on success.
	///
	/// Non-success statuses become [`DownstreamCallError::Status`]; every dispatcher error,
	/// including [`Error::ConsentRequired`], is returned unchanged.
	pub async fn call_api(&self, api: &str, method: Method, relative_path: &str) -> Result<String> {
		let response = self
			.dispatcher
			.dispatch(api, self.principal.as_ref(), OutboundRequest::new(method, relative_path))
			.await?;
		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|source| DownstreamCallError::Body { api: api.to_owned(), source });

		if status.is_success() {
			return Ok(body?);
		}

		Err(DownstreamCallError::Status {
			api: api.to_owned(),
			status: status.as_u16(),
			reason: status.canonical_reason(),
			body: body.unwrap_or_default(),
		}
		.into())
	}

	/// Shorthand for a `GET` [`call_api`](Self::call_api).
	pub async fn get(&self, api: &str, relative_path: &str) -> Result<String> {
		self.call_api(api, Method::GET, relative_path).await
	}
}
