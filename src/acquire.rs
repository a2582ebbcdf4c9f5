//! Token acquisition contract and the OAuth 2.0 implementation shipped with the crate.
//!
//! The dispatcher treats acquisition as a capability: given a scope set, a grant, and (for
//! delegated calls) a principal, a [`TokenAcquirer`] answers with a token, a consent signal,
//! or a failure. Consent is a tagged variant of [`Acquisition`], never an error the acquirer
//! has to smuggle through a side channel.

pub mod oauth;
pub mod strategy;
pub mod user_grant;

pub use oauth::*;
pub use strategy::*;
pub use user_grant::*;

// self
use crate::{
	_prelude::*,
	api::GrantKind,
	auth::{CachedToken, PrincipalId, ScopeSet},
	error::AcquisitionError,
};

/// Boxed future returned by [`TokenAcquirer::acquire`].
pub type AcquireFuture<'a> = Pin<Box<dyn Future<Output = Acquisition> + 'a + Send>>;

/// Capability that obtains tokens from an identity provider.
pub trait TokenAcquirer
where
	Self: Send + Sync,
{
	/// Acquires a token for `request`.
	///
	/// Implementations must not retry on consent signals; the dispatcher surfaces them to the
	/// caller as-is.
	fn acquire<'a>(&'a self, request: &'a AcquisitionRequest) -> AcquireFuture<'a>;
}

/// Inputs for one acquisition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcquisitionRequest {
	/// Scopes the token must carry.
	pub scopes: ScopeSet,
	/// Grant to use.
	pub grant: GrantKind,
	/// Signed-in principal; always present for [`GrantKind::DelegatedUser`] requests issued by
	/// the dispatcher.
	pub principal: Option<PrincipalId>,
}
impl AcquisitionRequest {
	/// Creates an app-only request.
	pub fn app_only(scopes: ScopeSet) -> Self {
		Self { scopes, grant: GrantKind::AppOnly, principal: None }
	}

	/// Creates a delegated request on behalf of `principal`.
	pub fn delegated(scopes: ScopeSet, principal: PrincipalId) -> Self {
		Self { scopes, grant: GrantKind::DelegatedUser, principal: Some(principal) }
	}
}

/// Outcome of a token acquisition.
#[derive(Debug)]
pub enum Acquisition {
	/// A token was issued.
	Acquired(CachedToken),
	/// The user must consent to the carried scopes before a token can be issued.
	ConsentRequired(ScopeSet),
	/// Acquisition failed for any other reason.
	Failed(AcquisitionError),
}
