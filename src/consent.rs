//! Incremental-consent redirects for [`ConsentRequired`] signals.
//!
//! The broker never runs the interactive flow itself; it only builds the authorization URL the
//! caller redirects the user to. The redirect asks for exactly the signaled scopes with
//! `prompt=consent`, plus a random `state` the caller must check when the user returns.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{_prelude::*, auth::ScopeSet, error::ConsentRequired};

const STATE_LEN: usize = 32;

/// Static parameters of the consent redirect, usually loaded from configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsentRedirect {
	/// Identity provider authorization endpoint.
	pub authorization_endpoint: Url,
	/// OAuth client identifier.
	pub client_id: String,
	/// Where the identity provider sends the user afterwards.
	pub redirect_uri: Url,
}
impl ConsentRedirect {
	/// Creates redirect parameters.
	pub fn new(
		authorization_endpoint: Url,
		client_id: impl Into<String>,
		redirect_uri: Url,
	) -> Self {
		Self { authorization_endpoint, client_id: client_id.into(), redirect_uri }
	}

	/// Builds a challenge for `signal`, optionally pre-filling the account with `login_hint`.
	pub fn challenge(
		&self,
		signal: &ConsentRequired,
		login_hint: Option<&str>,
	) -> ConsentChallenge {
		let state = random_string(STATE_LEN);
		let authorize_url = self.authorize_url(&signal.scopes, login_hint, &state);

		ConsentChallenge { scopes: signal.scopes.clone(), state, authorize_url }
	}

	fn authorize_url(&self, scopes: &ScopeSet, login_hint: Option<&str>, state: &str) -> Url {
		let mut url = self.authorization_endpoint.clone();

		{
			let mut pairs = url.query_pairs_mut();

			pairs
				.append_pair("client_id", &self.client_id)
				.append_pair("response_type", "code")
				.append_pair("redirect_uri", self.redirect_uri.as_str())
				.append_pair("scope", &scopes.normalized())
				.append_pair("prompt", "consent");

			if let Some(hint) = login_hint {
				pairs.append_pair("login_hint", hint);
			}

			pairs.append_pair("state", state);
		}

		url
	}
}

/// Interactive redirect that lets the user grant the missing scopes.
#[derive(Clone, PartialEq, Eq)]
pub struct ConsentChallenge {
	/// Scopes the user is asked to grant.
	pub scopes: ScopeSet,
	/// Opaque state value that must round-trip via the redirect handler.
	pub state: String,
	/// Authorization URL to redirect the user to.
	pub authorize_url: Url,
}
impl ConsentChallenge {
	/// Returns `true` when `returned_state` matches the state issued with this challenge.
	pub fn matches_state(&self, returned_state: &str) -> bool {
		returned_state == self.state
	}
}
impl Debug for ConsentChallenge {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConsentChallenge")
			.field("scopes", &self.scopes)
			.field("state", &"<redacted>")
			.field("authorize_url", &self.authorize_url.path())
			.finish()
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
