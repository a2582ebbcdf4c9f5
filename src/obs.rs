//! Optional observability helpers for dispatches.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to run every dispatch inside a `downstream_broker.dispatch` span carrying
//!   the `api` and `grant` fields, and to emit events for the token source, consent signals,
//!   acquisition failures, and tolerated cache faults.
//! - Enable `metrics` to increment `downstream_broker_dispatch_total` (labeled by `grant` +
//!   `outcome`) and `downstream_broker_token_source_total` (labeled by `grant` + `source`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchOutcome {
	/// Entry to the dispatcher.
	Attempt,
	/// A bearer token was attached.
	Success,
	/// The identity provider asked for user consent.
	ConsentRequired,
	/// Any other failure propagated back to the caller.
	Failure,
}
impl DispatchOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			DispatchOutcome::Attempt => "attempt",
			DispatchOutcome::Success => "success",
			DispatchOutcome::ConsentRequired => "consent_required",
			DispatchOutcome::Failure => "failure",
		}
	}
}
impl Display for DispatchOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Where the attached token came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenSource {
	/// Fresh entry in the token cache.
	Cache,
	/// New token from the acquisition provider.
	Provider,
}
impl TokenSource {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenSource::Cache => "cache",
			TokenSource::Provider => "provider",
		}
	}
}
impl Display for TokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
