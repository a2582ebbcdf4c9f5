// self
use crate::{
	api::GrantKind,
	obs::{DispatchOutcome, TokenSource},
};

/// Records a dispatch outcome via the global metrics recorder (when enabled).
pub fn record_dispatch_outcome(grant: GrantKind, outcome: DispatchOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"downstream_broker_dispatch_total",
			"grant" => grant.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (grant, outcome);
	}
}

/// Records where a dispatched token came from (when enabled).
pub fn record_token_source(grant: GrantKind, source: TokenSource) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"downstream_broker_token_source_total",
			"grant" => grant.as_str(),
			"source" => source.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (grant, source);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_are_safe_without_a_global_recorder() {
		record_dispatch_outcome(GrantKind::AppOnly, DispatchOutcome::Failure);
		record_token_source(GrantKind::DelegatedUser, TokenSource::Cache);
	}
}
