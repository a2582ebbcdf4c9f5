//! Sources of the long-lived user grants delegated acquisitions are redeemed from.

// self
use crate::{
	_prelude::*,
	auth::{PrincipalId, TokenSecret},
	error::AcquisitionError,
};

/// Boxed future returned by [`UserGrantSource`] operations.
pub type GrantFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, AcquisitionError>> + 'a + Send>>;

/// Holder of per-user refresh tokens, usually the sign-in session layer.
///
/// The broker only reads a principal's refresh token and writes back the rotated one the
/// identity provider may return; it never creates grants itself.
pub trait UserGrantSource
where
	Self: Send + Sync,
{
	/// Returns the refresh token for `principal`, if the user has signed in.
	fn refresh_token<'a>(&'a self, principal: &'a PrincipalId)
	-> GrantFuture<'a, Option<TokenSecret>>;

	/// Replaces the refresh token for `principal` after rotation.
	fn store_refresh_token<'a>(
		&'a self,
		principal: &'a PrincipalId,
		refresh_token: TokenSecret,
	) -> GrantFuture<'a, ()>;
}

/// In-process [`UserGrantSource`] keyed by principal.
#[derive(Clone, Debug, Default)]
pub struct MemoryUserGrants(Arc<RwLock<HashMap<PrincipalId, TokenSecret>>>);
impl MemoryUserGrants {
	/// Records the refresh token issued when `principal` signed in.
	pub fn insert(&self, principal: PrincipalId, refresh_token: impl Into<String>) {
		self.0.write().insert(principal, TokenSecret::new(refresh_token));
	}

	/// Forgets the grant for `principal` (for example on sign-out).
	pub fn remove(&self, principal: &PrincipalId) -> bool {
		self.0.write().remove(principal).is_some()
	}

	/// Returns the current refresh token for `principal` without going through a future.
	pub fn current(&self, principal: &PrincipalId) -> Option<TokenSecret> {
		self.0.read().get(principal).cloned()
	}
}
impl UserGrantSource for MemoryUserGrants {
	fn refresh_token<'a>(
		&'a self,
		principal: &'a PrincipalId,
	) -> GrantFuture<'a, Option<TokenSecret>> {
		Box::pin(async move { Ok(self.current(principal)) })
	}

	fn store_refresh_token<'a>(
		&'a self,
		principal: &'a PrincipalId,
		refresh_token: TokenSecret,
	) -> GrantFuture<'a, ()> {
		Box::pin(async move {
			self.0.write().insert(principal.to_owned(), refresh_token);

			Ok(())
		})
	}
}
