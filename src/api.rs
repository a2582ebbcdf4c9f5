//! Downstream API descriptors and the immutable registry the dispatcher resolves them from.
//!
//! A descriptor names one downstream API, where it lives, which scopes a token for it must
//! carry, and which grant obtains that token. The registry is built once at startup (usually
//! via [`ApiRegistry::from_config`]) and shared read-only afterwards.

pub mod descriptor;
pub mod registry;

pub use descriptor::*;
pub use registry::*;
