//! Retrying HTTP request wrapper that funnels every concurrent authorization failure through one
//! shared, single-flight credential renewal.
//!
//! The crate is built from three pieces:
//!
//! - [`renewal::RenewalGate`] guarantees at most one credential renewal is in flight, fans its
//!   outcome out to every waiter in arrival order, and bounds the wait with a timeout.
//! - [`client::Client`] drives a logical request through build → send → classify → recover
//!   cycles, retrying up to the configured bound.
//! - [`http::Transport`], [`headers::HeaderBuilder`], [`classify::OutcomeClassifier`], and
//!   [`renewal::CredentialRenewer`] are the seams where callers plug in their own network stack,
//!   header policy, error taxonomy, and identity provider.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod http;
pub mod obs;
pub mod renewal;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
