//! Name-indexed lookup of downstream API descriptors.

// self
use crate::{
	_prelude::*,
	api::DownstreamApiDescriptor,
	auth::ApiName,
	config::BrokerConfig,
	error::ConfigError,
};

/// Immutable set of downstream API descriptors keyed by name.
///
/// Lookups are case-sensitive and never touch the network or the token cache.
#[derive(Clone, Debug, Default)]
pub struct ApiRegistry {
	apis: HashMap<ApiName, DownstreamApiDescriptor>,
}
impl ApiRegistry {
	/// Builds a registry, rejecting duplicate names.
	pub fn new<I>(descriptors: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = DownstreamApiDescriptor>,
	{
		let mut apis = HashMap::new();

		for descriptor in descriptors {
			let name = descriptor.name.clone();

			if apis.insert(name.clone(), descriptor).is_some() {
				return Err(ConfigError::DuplicateApi { name: name.into() });
			}
		}

		Ok(Self { apis })
	}

	/// Builds a registry from the `DownstreamApis` section of a configuration document.
	pub fn from_config(config: &BrokerConfig) -> Result<Self, ConfigError> {
		config.registry()
	}

	/// Resolves a descriptor by its logical name.
	pub fn resolve(&self, name: &str) -> Result<&DownstreamApiDescriptor, ConfigError> {
		self.apis.get(name).ok_or_else(|| ConfigError::UnknownApi { name: name.to_owned() })
	}

	/// Returns `true` when a descriptor with `name` is registered.
	pub fn contains(&self, name: &str) -> bool {
		self.apis.contains_key(name)
	}

	/// Number of registered descriptors.
	pub fn len(&self) -> usize {
		self.apis.len()
	}

	/// Returns `true` when no descriptors are registered.
	pub fn is_empty(&self) -> bool {
		self.apis.is_empty()
	}

	/// Iterates over registered descriptors in unspecified order.
	pub fn iter(&self) -> impl Iterator<Item = &DownstreamApiDescriptor> {
		self.apis.values()
	}
}
