//! Token values handled by the broker: the redacted secret and the cached bearer token.

pub mod cached;
pub mod secret;
