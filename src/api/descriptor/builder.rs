// self
use crate::{
	_prelude::*,
	api::{DownstreamApiDescriptor, GrantKind},
	auth::{ApiName, ScopeSet, ScopeValidationError},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum DescriptorError {
	/// Base address is required.
	#[error("Missing base address.")]
	MissingBaseAddress,
	/// Base address must be an HTTP(S) URL that can carry paths.
	#[error("Base address must be an absolute http(s) URL: {url}.")]
	InvalidBaseAddress {
		/// Offending URL.
		url: String,
	},
	/// At least one scope must be configured.
	#[error("At least one scope must be configured.")]
	MissingScopes,
	/// A configured scope is malformed.
	#[error(transparent)]
	InvalidScope(#[from] ScopeValidationError),
}

/// Builder for [`DownstreamApiDescriptor`] values.
#[derive(Debug)]
pub struct DownstreamApiDescriptorBuilder {
	name: ApiName,
	base_address: Option<Url>,
	scopes: Vec<String>,
	grant: GrantKind,
}
impl DownstreamApiDescriptorBuilder {
	/// Creates a builder for a delegated-user API with no scopes.
	pub fn new(name: ApiName) -> Self {
		Self { name, base_address: None, scopes: Vec::new(), grant: GrantKind::DelegatedUser }
	}

	/// Sets the base address.
	pub fn base_address(mut self, url: Url) -> Self {
		self.base_address = Some(url);

		self
	}

	/// Adds one scope.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scopes.push(scope.into());

		self
	}

	/// Adds several scopes.
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes.extend(scopes.into_iter().map(Into::into));

		self
	}

	/// Selects the grant.
	pub fn grant(mut self, grant: GrantKind) -> Self {
		self.grant = grant;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<DownstreamApiDescriptor, DescriptorError> {
		let base_address = self.base_address.ok_or(DescriptorError::MissingBaseAddress)?;

		if !matches!(base_address.scheme(), "http" | "https") || base_address.cannot_be_a_base() {
			return Err(DescriptorError::InvalidBaseAddress { url: base_address.to_string() });
		}

		let scopes = ScopeSet::new(self.scopes)?;

		if scopes.is_empty() {
			return Err(DescriptorError::MissingScopes);
		}

		Ok(DownstreamApiDescriptor { name: self.name, base_address, scopes, grant: self.grant })
	}
}
