//! Broker-level error types shared by the dispatcher, acquirers, and the API client.

// self
use crate::{_prelude::*, auth::ScopeSet};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Unknown API name or invalid local configuration.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The signed-in user has not granted the requested scopes.
	#[error(transparent)]
	ConsentRequired(#[from] ConsentRequired),
	/// Token could not be acquired; the outbound request was not sent.
	#[error(transparent)]
	TokenAcquisition(#[from] AcquisitionError),
	/// The downstream call itself failed or returned a non-success status.
	#[error(transparent)]
	Downstream(#[from] DownstreamCallError),
}
impl Error {
	/// Returns the consent signal when this error asks for an interactive consent redirect.
	pub fn consent_required(&self) -> Option<&ConsentRequired> {
		match self {
			Self::ConsentRequired(signal) => Some(signal),
			_ => None,
		}
	}
}

/// Signal raised when the identity provider reports missing user consent.
///
/// The signal carries the scopes that must be granted and never a token. Callers are expected
/// to send the user through an incremental-consent redirect (see
/// [`ConsentChallenge`](crate::consent::ConsentChallenge)) instead of retrying.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("User consent is required for scopes: {scopes}.")]
pub struct ConsentRequired {
	/// Scopes the user must grant before the call can succeed.
	pub scopes: ScopeSet,
}
impl ConsentRequired {
	/// Creates a signal for the provided scope set.
	pub fn new(scopes: ScopeSet) -> Self {
		Self { scopes }
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No descriptor is registered under the requested name.
	#[error("Downstream API `{name}` is not registered.")]
	UnknownApi {
		/// Requested API name.
		name: String,
	},
	/// Two descriptors share the same name.
	#[error("Downstream API `{name}` is registered more than once.")]
	DuplicateApi {
		/// Conflicting API name.
		name: String,
	},
	/// Descriptor failed validation.
	#[error("Downstream API `{name}` is misconfigured.")]
	InvalidDescriptor {
		/// API name from configuration.
		name: String,
		/// Validation failure.
		#[source]
		source: crate::api::DescriptorError,
	},
	/// API name from configuration is not a valid identifier.
	#[error("Downstream API name is invalid.")]
	InvalidApiName(#[from] crate::auth::IdentifierError),
	/// Relative path cannot be joined onto the descriptor's base address, or would leave it.
	#[error("Relative path `{path}` cannot be resolved against the API base address.")]
	InvalidRelativePath {
		/// Offending relative path.
		path: String,
		/// Underlying parsing failure, when the path did not parse at all.
		#[source]
		source: Option<url::ParseError>,
	},
	/// A configured URL cannot be parsed.
	#[error("Configured URL for `{field}` is invalid.")]
	InvalidUrl {
		/// Configuration field holding the URL.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A required configuration section is absent.
	#[error("Configuration section `{section}` is missing.")]
	MissingSection {
		/// Missing section name.
		section: &'static str,
	},
	/// Configuration document could not be read.
	#[error("Configuration file {path} could not be read.")]
	Read {
		/// File path.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Configuration document is malformed.
	#[error("Configuration document is malformed.")]
	Parse {
		/// Structured parsing failure including the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: ReqwestError,
	},
	/// Token cache backend could not be reached at startup.
	#[error("Token cache backend could not be initialized.")]
	CacheBackend(#[from] crate::store::StoreError),
}

/// Token acquisition failures other than missing consent.
///
/// All variants are the same category for callers: the request was not sent and a fresh
/// attempt may succeed. The broker itself never retries.
#[derive(Debug, ThisError)]
pub enum AcquisitionError {
	/// Delegated API called without a signed-in principal.
	#[error("Downstream API `{api}` requires a signed-in user.")]
	MissingPrincipal {
		/// API name.
		api: String,
	},
	/// No user grant (refresh token) is available for the principal.
	#[error("No user grant is available for principal {principal}.")]
	MissingUserGrant {
		/// Principal identifier.
		principal: String,
	},
	/// Identity provider rejected the request.
	#[error("Identity provider rejected the token request: {reason}.")]
	Rejected {
		/// Provider-supplied reason.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Identity provider reported a temporary failure.
	#[error("Identity provider is temporarily unavailable: {message}.")]
	Transient {
		/// Provider- or broker-supplied message.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint response is well-formed but unusable.
	#[error("Token endpoint response is invalid: {reason}.")]
	InvalidResponse {
		/// Why the response was rejected.
		reason: &'static str,
	},
	/// Network failure while calling the identity provider.
	#[error("Network error occurred while calling the identity provider.")]
	Network {
		/// Transport-specific error.
		#[source]
		source: BoxError,
	},
	/// Acquisition did not finish within the configured bound.
	#[error("Token acquisition timed out after {after}.")]
	TimedOut {
		/// Elapsed bound.
		after: Duration,
	},
	/// Failure reported by a custom acquirer.
	#[error("Token acquisition failed.")]
	Other {
		/// Underlying failure.
		#[source]
		source: BoxError,
	},
}
impl AcquisitionError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps an arbitrary failure from a custom acquirer.
	pub fn other(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Other { source: Box::new(src) }
	}
}

/// Failures of the outbound call to the downstream API.
#[derive(Debug, ThisError)]
pub enum DownstreamCallError {
	/// Downstream API answered with a non-success status.
	#[error("Downstream API `{api}` returned {status}{}.", reason_suffix(.reason))]
	Status {
		/// API name.
		api: String,
		/// HTTP status code.
		status: u16,
		/// Canonical reason phrase, when known.
		reason: Option<&'static str>,
		/// Response body, as far as it could be read.
		body: String,
	},
	/// Request never produced a response (DNS, TLS, timeout, connection reset).
	#[error("Transport error occurred while calling downstream API `{api}`.")]
	Transport {
		/// API name.
		api: String,
		/// Underlying reqwest failure.
		#[source]
		source: ReqwestError,
	},
	/// Response body could not be read.
	#[error("Response body from downstream API `{api}` could not be read.")]
	Body {
		/// API name.
		api: String,
		/// Underlying reqwest failure.
		#[source]
		source: ReqwestError,
	},
}
impl DownstreamCallError {
	/// HTTP status code, when the downstream API produced a response.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			_ => None,
		}
	}
}

fn reason_suffix(reason: &Option<&'static str>) -> String {
	reason.map(|value| format!(" {value}")).unwrap_or_default()
}
