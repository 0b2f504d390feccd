//! Client-level error types shared across the executor, dispatcher, and session layers.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Server demanded a fresh DPoP nonce.
	///
	/// The dispatcher consumes this variant and retries once; callers only observe it when
	/// they drive [`RequestExecutor`](crate::http::RequestExecutor) directly.
	#[error("Server requires a fresh DPoP nonce.")]
	NonceRequired {
		/// HTTP status code (normally 400).
		status: u16,
		/// Response headers, including the new `DPoP-Nonce`.
		headers: HeaderMap,
		/// Raw response body.
		body: String,
	},
	/// Access token was rejected as expired.
	#[error("Access token has expired.")]
	TokenExpired {
		/// Raw response body.
		body: String,
	},
	/// Authorization denied for a reason other than plain expiry.
	#[error("Unauthorized: {error}{}", message_suffix(.message))]
	Auth {
		/// Upstream `error` code.
		error: String,
		/// Upstream `message`, when supplied.
		message: Option<String>,
		/// Raw response body.
		body: String,
	},
	/// The refresh or token exchange call itself failed.
	#[error("Token refresh failed: {status} - {body}")]
	RefreshToken {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// Any other non-success response, including an exhausted nonce retry.
	#[error("Request failed: {status} - {body}")]
	Api {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// A success response carried a body that could not be parsed.
	#[error("Response body could not be parsed as JSON at `{path}`.")]
	Parse {
		/// Location of the failure inside the document (`.` for the root).
		path: String,
		/// Underlying JSON failure.
		#[source]
		source: serde_json::Error,
		/// HTTP status code of the response.
		status: u16,
	},
}
impl Error {
	/// Returns the upstream HTTP status carried by response-derived variants.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::NonceRequired { status, .. }
			| Self::RefreshToken { status, .. }
			| Self::Api { status, .. }
			| Self::Parse { status, .. } => Some(*status),
			Self::TokenExpired { .. } | Self::Auth { .. } => Some(401),
			Self::Config(_) | Self::Transport(_) => None,
		}
	}

	/// Builds a [`Error::Parse`] from a path-tracked JSON failure.
	pub(crate) fn parse(status: StatusCode, err: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = err.path().to_string();

		Self::Parse { path, source: err.into_inner(), status: status.as_u16() }
	}

	/// Returns `true` for the expired-access-token variant.
	pub fn is_token_expired(&self) -> bool {
		matches!(self, Self::TokenExpired { .. })
	}

	/// Re-labels upstream rejections raised while talking to a token endpoint.
	pub(crate) fn into_refresh_error(self) -> Self {
		match self {
			Self::Api { status, body } | Self::NonceRequired { status, body, .. } =>
				Self::RefreshToken { status, body },
			Self::TokenExpired { body } | Self::Auth { body, .. } =>
				Self::RefreshToken { status: 401, body },
			other => other,
		}
	}
}

fn message_suffix(message: &Option<String>) -> String {
	message.as_deref().map(|m| format!(" - {m}")).unwrap_or_default()
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
	/// A header value contains characters HTTP forbids.
	#[error(transparent)]
	InvalidHeaderValue(#[from] ::http::header::InvalidHeaderValue),
	/// Request body could not be encoded as JSON.
	#[error("Request body could not be encoded as JSON.")]
	BodyEncode(#[source] serde_json::Error),
	/// JWT header or claims could not be encoded.
	#[error("JWT header or claims could not be encoded.")]
	JwtEncode(#[source] serde_json::Error),
	/// Endpoint URL cannot be parsed or joined.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},

	/// No signing key could be obtained.
	#[error("No DPoP signing key is available.")]
	MissingSigningKey,
	/// The supplied key is not a usable P-256 private key.
	#[error("Signing key is invalid: {reason}.")]
	InvalidSigningKey {
		/// Description of the rejected key material.
		reason: String,
	},
	/// A client-authenticated flow was invoked without a client id.
	#[error("OAuth client id is required for client-authenticated token requests.")]
	MissingClientId,
	/// A client-authenticated flow was invoked without a client JWK.
	#[error("OAuth client JWK is required for client-authenticated token requests.")]
	MissingClientJwk,
	/// Session holds no refresh token.
	#[error("Session is missing a refresh token.")]
	MissingRefreshToken,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<url::ParseError> for ConfigError {
	fn from(source: url::ParseError) -> Self {
		Self::InvalidEndpoint { source }
	}
}

/// Transport-level failures.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the remote API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
