//! Token cache contracts and built-in store implementations.
//!
//! Stores return whatever they hold for a key and overwrite on `put`. Freshness is decided by
//! the dispatcher, and eviction is the store's own policy ([`MemoryStore::purge_expired`], or
//! the Redis `EX` TTL in `RedisStore`).

pub mod memory;
#[cfg(feature = "redis")] pub mod redis;

pub use memory::MemoryStore;
#[cfg(feature = "redis")] pub use self::redis::RedisStore;

// self
use crate::{
	_prelude::*,
	api::GrantKind,
	auth::{CachedToken, PrincipalId, ScopeSet},
};

/// Boxed future returned by [`TokenCacheStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by token caches.
pub trait TokenCacheStore
where
	Self: Send + Sync,
{
	/// Fetches the token stored under `key`, if any, regardless of its expiry.
	fn get<'a>(&'a self, key: &'a TokenCacheKey) -> StoreFuture<'a, Option<CachedToken>>;

	/// Stores `token` under `key`, replacing any previous entry in a single write.
	fn put<'a>(&'a self, key: &'a TokenCacheKey, token: CachedToken) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`TokenCacheStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StoreError {
	/// Cached value could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Identity of one cached token: who it was issued for, which scopes, and which grant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TokenCacheKey {
	/// Signed-in principal for delegated tokens; `None` for app-only tokens.
	pub principal: Option<PrincipalId>,
	/// Normalized scope set the token was requested with.
	pub scopes: ScopeSet,
	/// Grant the token was obtained with.
	pub grant: GrantKind,
}
impl TokenCacheKey {
	/// Builds a key; the principal is dropped for app-only grants so every caller shares one entry.
	pub fn new(grant: GrantKind, scopes: ScopeSet, principal: Option<PrincipalId>) -> Self {
		let principal = if grant.requires_principal() { principal } else { None };

		Self { principal, scopes, grant }
	}

	/// Stable string form for external key-value stores:
	/// `<grant>:<principal or "">:<scope fingerprint>`.
	pub fn storage_key(&self) -> String {
		format!(
			"{}:{}:{}",
			self.grant.as_str(),
			self.principal.as_ref().map(PrincipalId::as_str).unwrap_or_default(),
			self.scopes.fingerprint()
		)
	}
}
impl Display for TokenCacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.storage_key())
	}
}
