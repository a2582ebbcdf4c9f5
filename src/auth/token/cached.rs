//! Cached bearer tokens and their freshness rules.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Bearer token as held by the token cache.
///
/// Tokens are immutable once acquired. The dispatcher replaces an entry instead of editing it
/// once [`is_fresh_at`](Self::is_fresh_at) turns false.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
	/// Opaque token value.
	pub value: TokenSecret,
	/// Instant the identity provider stops accepting the token.
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Creates a token expiring at the provided instant.
	pub fn new(value: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { value: TokenSecret::new(value), expires_at }
	}

	/// Creates a token expiring `lifetime` after `issued_at`.
	pub fn issued_at(
		value: impl Into<String>,
		issued_at: OffsetDateTime,
		lifetime: Duration,
	) -> Self {
		Self::new(value, issued_at + lifetime)
	}

	/// Returns `true` when the token stays valid beyond `now + margin`.
	///
	/// The margin keeps a token from expiring while the request carrying it is in flight.
	pub fn is_fresh_at(&self, now: OffsetDateTime, margin: Duration) -> bool {
		now + margin < self.expires_at
	}

	/// Time left until expiry, clamped at zero.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - now;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for CachedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedToken")
			.field("value", &self.value)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
