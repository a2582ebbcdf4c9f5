//! Descriptor data and validation for a single downstream API.

/// Builder API for assembling descriptors.
pub mod builder;
/// Grant selection for descriptors.
pub mod grant;

pub use builder::*;
pub use grant::*;

// self
use crate::{
	_prelude::*,
	auth::{ApiName, ScopeSet},
	error::ConfigError,
};

/// Immutable description of one downstream API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownstreamApiDescriptor {
	/// Unique logical name used by callers.
	pub name: ApiName,
	/// Base address every relative path is resolved against.
	pub base_address: Url,
	/// Scopes requested for tokens sent to this API.
	pub scopes: ScopeSet,
	/// Grant used to obtain those tokens.
	pub grant: GrantKind,
}
impl DownstreamApiDescriptor {
	/// Creates a new builder for the provided name.
	pub fn builder(name: ApiName) -> DownstreamApiDescriptorBuilder {
		DownstreamApiDescriptorBuilder::new(name)
	}

	/// Resolves a relative path (optionally with a query) against the base address.
	///
	/// The base address is treated as a directory even without a trailing slash, and a leading
	/// slash on `relative_path` does not discard the base path. The result always stays on the
	/// base address: absolute URLs, scheme-relative paths (`//host`), and dot segments that climb
	/// above the base path are rejected, so a bearer token never leaves the registered API.
	pub fn resolve(&self, relative_path: &str) -> Result<Url, ConfigError> {
		let invalid = |source: Option<url::ParseError>| ConfigError::InvalidRelativePath {
			path: relative_path.to_owned(),
			source,
		};

		if relative_path.starts_with("//")
			|| relative_path.starts_with('\\')
			|| Url::parse(relative_path).is_ok()
		{
			return Err(invalid(None));
		}

		let mut base = self.base_address.clone();

		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		let url = base.join(relative_path.trim_start_matches('/')).map_err(|e| invalid(Some(e)))?;

		if !stays_on_base(&base, &url) {
			return Err(invalid(None));
		}

		Ok(url)
	}
}

fn stays_on_base(base: &Url, url: &Url) -> bool {
	url.scheme() == base.scheme()
		&& url.host() == base.host()
		&& url.port_or_known_default() == base.port_or_known_default()
		&& url.path().starts_with(base.path())
}
