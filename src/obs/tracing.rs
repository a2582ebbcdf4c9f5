// self
use crate::{
	_prelude::*,
	api::GrantKind,
	obs::TokenSource,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedDispatch<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedDispatch<F> = F;

/// Span wrapping one dispatch.
#[derive(Clone, Debug)]
pub struct DispatchSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl DispatchSpan {
	/// Creates a new span tagged with the API name and grant.
	pub fn new(api: &str, grant: GrantKind) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("downstream_broker.dispatch", api, grant = grant.as_str());

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (api, grant);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedDispatch<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs which source supplied the attached token.
pub fn log_token_source(source: TokenSource) {
	#[cfg(feature = "tracing")]
	tracing::debug!(source = source.as_str(), "Bearer token attached.");
	#[cfg(not(feature = "tracing"))]
	let _ = source;
}

/// Logs a consent signal for the provided scopes.
pub fn log_consent_required(scopes: &str) {
	#[cfg(feature = "tracing")]
	tracing::info!(scopes, "Identity provider requires user consent.");
	#[cfg(not(feature = "tracing"))]
	let _ = scopes;
}

/// Logs an acquisition failure.
pub fn log_acquisition_failure(error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(error = %error, "Token acquisition failed.");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

/// Logs a cache fault that the dispatcher tolerated.
pub fn log_store_fault(operation: &'static str, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		operation,
		error = %error,
		"Token cache operation failed; continuing without it."
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (operation, error);
}
