// std
use std::sync::atomic::{AtomicU64, Ordering};

/// In-process counters describing how dispatches obtained their tokens.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
	cache_hits: AtomicU64,
	acquisitions: AtomicU64,
	consent_required: AtomicU64,
	failures: AtomicU64,
}
impl DispatchMetrics {
	/// Dispatches served from a fresh cache entry.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Calls made to the acquisition provider.
	pub fn acquisitions(&self) -> u64 {
		self.acquisitions.load(Ordering::Relaxed)
	}

	/// Consent signals surfaced to callers.
	pub fn consent_required(&self) -> u64 {
		self.consent_required.load(Ordering::Relaxed)
	}

	/// Dispatches that failed before the request was sent, excluding consent signals.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_acquisition(&self) {
		self.acquisitions.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_consent_required(&self) {
		self.consent_required.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
