//! Classification hooks that turn token endpoint failures into acquisition outcomes.
//!
//! Implementations decorate outgoing token requests and decide which failures mean "ask the
//! user for consent", which are temporary, and which are outright rejections.

// self
use crate::{_prelude::*, api::GrantKind};

/// OAuth error codes that identity providers use to request user interaction.
const CONSENT_ERRORS: [&str; 3] = ["consent_required", "interaction_required", "login_required"];
/// Microsoft identity platform code for "user or administrator has not consented".
const AADSTS_CONSENT: &str = "aadsts65001";

/// Strategy hook that allows deployments to decorate requests and classify errors.
///
/// Override only what you need: `augment_token_request` defaults to a no-op.
pub trait AcquisitionStrategy
where
	Self: Send + Sync,
{
	/// Maps a token endpoint failure onto an acquisition outcome category.
	fn classify_token_error(&self, ctx: &TokenErrorContext) -> TokenErrorKind;

	/// Adds custom form parameters (for example `resource` or `audience`) before dispatching.
	fn augment_token_request(&self, _grant: GrantKind, _form: &mut BTreeMap<String, String>) {}
}

/// Outcome categories produced by [`AcquisitionStrategy::classify_token_error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenErrorKind {
	/// User must grant consent interactively.
	ConsentRequired,
	/// Identity provider refused the request.
	Rejected,
	/// Failure is temporary; a later attempt may succeed.
	Transient,
}

/// Client-agnostic description of a failed token request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenErrorContext {
	/// Grant associated with the failing request.
	pub grant: GrantKind,
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// Provider-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Provider-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
	/// Whether the failure originated in the transport layer.
	pub network_error: bool,
}
impl TokenErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a new context scoped to the provided grant.
	pub fn new(grant: GrantKind) -> Self {
		Self {
			grant,
			http_status: None,
			oauth_error: None,
			error_description: None,
			body_preview: None,
			network_error: false,
		}
	}

	/// Context for transport-level failures.
	pub fn network_failure(grant: GrantKind) -> Self {
		let mut ctx = Self::new(grant);

		ctx.network_error = true;

		ctx
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: Option<u16>) -> Self {
		self.http_status = status;

		self
	}

	/// Adds the OAuth `error` code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a truncated body preview.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(body.into().chars().take(Self::BODY_PREVIEW_LIMIT).collect());

		self
	}
}

/// Default classification.
///
/// - Network failures, `server_error`, `temporarily_unavailable`, 429, and 5xx are transient.
/// - `consent_required`, `interaction_required`, `login_required`, `AADSTS65001` anywhere in the
///   description or body, and `invalid_grant` on a delegated request require consent.
/// - Everything else is a rejection.
#[derive(Debug, Default)]
pub struct DefaultAcquisitionStrategy;
impl Display for DefaultAcquisitionStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-acquisition-strategy")
	}
}
impl AcquisitionStrategy for DefaultAcquisitionStrategy {
	fn classify_token_error(&self, ctx: &TokenErrorContext) -> TokenErrorKind {
		if ctx.network_error {
			return TokenErrorKind::Transient;
		}
		if mentions_consent(ctx.error_description.as_deref())
			|| mentions_consent(ctx.body_preview.as_deref())
		{
			return TokenErrorKind::ConsentRequired;
		}
		if let Some(kind) =
			ctx.oauth_error.as_deref().and_then(|code| classify_code(ctx.grant, code))
		{
			return kind;
		}

		classify_status(ctx.http_status)
	}
}

fn mentions_consent(text: Option<&str>) -> bool {
	text.is_some_and(|text| text.to_ascii_lowercase().contains(AADSTS_CONSENT))
}

fn classify_code(grant: GrantKind, code: &str) -> Option<TokenErrorKind> {
	if CONSENT_ERRORS.iter().any(|candidate| code.eq_ignore_ascii_case(candidate)) {
		Some(TokenErrorKind::ConsentRequired)
	} else if code.eq_ignore_ascii_case("invalid_grant") {
		Some(match grant {
			GrantKind::DelegatedUser => TokenErrorKind::ConsentRequired,
			GrantKind::AppOnly => TokenErrorKind::Rejected,
		})
	} else if code.eq_ignore_ascii_case("server_error")
		|| code.eq_ignore_ascii_case("temporarily_unavailable")
	{
		Some(TokenErrorKind::Transient)
	} else {
		None
	}
}

fn classify_status(status: Option<u16>) -> TokenErrorKind {
	match status {
		Some(429) => TokenErrorKind::Transient,
		Some(code) if code >= 500 => TokenErrorKind::Transient,
		_ => TokenErrorKind::Rejected,
	}
}
