// self
use crate::_prelude::*;

/// OAuth 2.0 grant a downstream API's tokens are obtained with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
	/// Application-only token (client credentials, no end user).
	AppOnly,
	/// Token issued on behalf of the signed-in user.
	DelegatedUser,
}
impl GrantKind {
	/// Returns a stable label used in cache keys, spans, and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantKind::AppOnly => "app_only",
			GrantKind::DelegatedUser => "delegated_user",
		}
	}

	/// Returns `true` when tokens are bound to a signed-in principal.
	pub const fn requires_principal(self) -> bool {
		matches!(self, GrantKind::DelegatedUser)
	}
}
impl Display for GrantKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
