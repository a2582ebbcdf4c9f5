//! Redis/Valkey-backed [`TokenCacheStore`] shared across front-end instances.

// crates.io
use ::redis::{Client, aio::ConnectionManager};
// self
use crate::{
	_prelude::*,
	auth::CachedToken,
	store::{StoreError, StoreFuture, TokenCacheKey, TokenCacheStore},
};

/// Key prefix applied to every entry unless overridden.
pub const DEFAULT_KEY_PREFIX: &str = "downstream-broker:token:";

/// Token cache stored in Redis (or any RESP-compatible server such as Valkey).
///
/// Values are JSON-encoded [`CachedToken`]s written with a single `SET key value EX ttl`, where
/// the TTL is the token's remaining lifetime (at least one second).
#[derive(Clone)]
pub struct RedisStore {
	manager: ConnectionManager,
	prefix: String,
}
impl RedisStore {
	/// Connects to `url` (for example `redis://localhost:6379`) using the default key prefix.
	pub async fn connect(url: &str) -> Result<Self, StoreError> {
		let client = Client::open(url).map_err(backend)?;
		let manager = client.get_connection_manager().await.map_err(backend)?;

		Ok(Self { manager, prefix: DEFAULT_KEY_PREFIX.into() })
	}

	/// Overrides the key prefix.
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();

		self
	}

	/// Full Redis key for a cache key.
	pub fn redis_key(&self, key: &TokenCacheKey) -> String {
		format!("{}{}", self.prefix, key.storage_key())
	}
}
impl Debug for RedisStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RedisStore").field("prefix", &self.prefix).finish_non_exhaustive()
	}
}
impl TokenCacheStore for RedisStore {
	fn get<'a>(&'a self, key: &'a TokenCacheKey) -> StoreFuture<'a, Option<CachedToken>> {
		Box::pin(async move {
			let mut conn = self.manager.clone();
			let raw: Option<String> = ::redis::cmd("GET")
				.arg(self.redis_key(key))
				.query_async(&mut conn)
				.await
				.map_err(backend)?;

			raw.map(|payload| decode(&payload)).transpose()
		})
	}

	fn put<'a>(&'a self, key: &'a TokenCacheKey, token: CachedToken) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let ttl = ttl_seconds(&token, OffsetDateTime::now_utc());
			let payload = serde_json::to_string(&token)
				.map_err(|e| StoreError::Serialization { message: e.to_string() })?;
			let mut conn = self.manager.clone();
			let _: () = ::redis::cmd("SET")
				.arg(self.redis_key(key))
				.arg(payload)
				.arg("EX")
				.arg(ttl)
				.query_async(&mut conn)
				.await
				.map_err(backend)?;

			Ok(())
		})
	}
}

fn backend(e: ::redis::RedisError) -> StoreError {
	StoreError::Backend { message: e.to_string() }
}

fn decode(payload: &str) -> Result<CachedToken, StoreError> {
	serde_json::from_str(payload).map_err(|e| StoreError::Serialization { message: e.to_string() })
}

fn ttl_seconds(token: &CachedToken, now: OffsetDateTime) -> u64 {
	token.remaining_at(now).whole_seconds().max(1) as u64
}
