//! Token-mediated outbound request broker: route downstream API calls through cached app-only or
//! delegated OAuth 2.0 tokens, with missing user consent surfaced as a first-class signal.
//!
//! The usual wiring loads a [`BrokerConfig`](config::BrokerConfig), opens a token cache, builds
//! an [`OAuthAcquirer`](acquire::OAuthAcquirer), and hands all three to a
//! [`Dispatcher`](dispatch::Dispatcher). Request handlers then wrap the shared dispatcher in an
//! [`ApiClient`](client::ApiClient) for the current user and call APIs by name.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod acquire;
pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod consent;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod obs;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
