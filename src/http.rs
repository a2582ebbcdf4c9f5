//! Reqwest transport behind the `oauth2` token exchanges.
//!
//! [`ReqwestHttpClient`] hands out short-lived [`InstrumentedHandle`]s that implement
//! [`AsyncHttpClient`] and record the token endpoint's HTTP status into a
//! [`ResponseMetadataSlot`], so error classification still sees the status after `oauth2` has
//! consumed the response.

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, error::ConfigError};

/// Metadata captured from the most recent token endpoint response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint, if a response arrived.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}

	/// Captured HTTP status, consuming the slot.
	pub fn take_status(&self) -> Option<u16> {
		self.take().and_then(|meta| meta.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] used for token endpoint calls.
///
/// Token endpoints answer directly, so [`ReqwestHttpClient::new`] builds a client that never
/// follows redirects.
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(ReqwestClient);
impl ReqwestHttpClient {
	/// Builds a non-redirecting client with an optional overall request timeout.
	pub fn new(timeout: Option<std::time::Duration>) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder().redirect(Policy::none());

		if let Some(timeout) = timeout {
			builder = builder.timeout(timeout);
		}

		builder
			.build()
			.map(Self)
			.map_err(|source| ConfigError::HttpClientBuild { source })
	}

	/// Builds an instrumented handle that records response metadata into `slot`.
	pub fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle { client: self.0.clone(), slot }
	}
}

/// [`AsyncHttpClient`] adapter over reqwest that reports status codes to a metadata slot.
#[derive(Clone, Debug)]
pub struct InstrumentedHandle {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let response =
				self.client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			self.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
