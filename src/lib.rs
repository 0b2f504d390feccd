//! DPoP-aware HTTP session client: per-request ES256 proofs, server nonce tracking, and
//! single-flight access/refresh token rotation.
//!
//! The layers stack leaf-first:
//!
//! - [`http::RequestExecutor`] sends one request and classifies the response.
//! - [`dpop::ProofGenerator`] signs a fresh proof per request, reading the shared
//!   [`dpop::NonceTracker`].
//! - [`dispatch::DpopDispatcher`] retries exactly once when the server demands a new nonce.
//! - [`session::SessionClient`] injects the access token and refreshes + retries exactly once
//!   when the server reports an expired token.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod dpop;
pub mod error;
pub mod http;
pub mod obs;
pub mod session;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use ::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map as JsonMap, Value as JsonValue};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _};
