//! Thread-safe in-memory [`TokenCacheStore`] implementation for single instances and tests.

// self
use crate::{
	_prelude::*,
	auth::CachedToken,
	store::{StoreFuture, TokenCacheKey, TokenCacheStore},
};

type StoreMap = Arc<RwLock<HashMap<TokenCacheKey, CachedToken>>>;

/// In-process token cache backed by a read/write-locked map.
///
/// Locks are taken and released synchronously inside each operation, so no guard ever spans
/// an `.await`.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of cached entries, including expired ones not yet purged.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when the cache holds no entries.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Drops every entry whose expiry is at or before `now`, returning how many were removed.
	pub fn purge_expired(&self, now: OffsetDateTime) -> usize {
		let mut guard = self.0.write();
		let before = guard.len();

		guard.retain(|_, token| token.expires_at > now);

		before - guard.len()
	}

	fn get_now(map: &StoreMap, key: &TokenCacheKey) -> Option<CachedToken> {
		map.read().get(key).cloned()
	}

	fn put_now(map: &StoreMap, key: TokenCacheKey, token: CachedToken) {
		map.write().insert(key, token);
	}
}
impl TokenCacheStore for MemoryStore {
	fn get<'a>(&'a self, key: &'a TokenCacheKey) -> StoreFuture<'a, Option<CachedToken>> {
		Box::pin(async move { Ok(Self::get_now(&self.0, key)) })
	}

	fn put<'a>(&'a self, key: &'a TokenCacheKey, token: CachedToken) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			Self::put_now(&self.0, key.to_owned(), token);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;
	use crate::{api::GrantKind, auth::ScopeSet};

	fn key(scope: &str) -> TokenCacheKey {
		TokenCacheKey::new(
			GrantKind::AppOnly,
			ScopeSet::new([scope]).expect("Scope fixture should be valid."),
			None,
		)
	}

	#[test]
	fn purge_expired_keeps_live_entries() {
		let store = MemoryStore::default();
		let now = datetime!(2025-01-01 00:00:00 UTC);

		MemoryStore::put_now(
			&store.0,
			key("a"),
			CachedToken::new("old", now - Duration::seconds(1)),
		);
		MemoryStore::put_now(
			&store.0,
			key("b"),
			CachedToken::new("live", now + Duration::hours(1)),
		);

		assert_eq!(store.len(), 2);
		assert_eq!(store.purge_expired(now), 1);
		assert_eq!(store.len(), 1);
		assert!(MemoryStore::get_now(&store.0, &key("a")).is_none());
		assert!(MemoryStore::get_now(&store.0, &key("b")).is_some());
	}
}
