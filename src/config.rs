//! Client configuration: base URL, token endpoints, and the optional OAuth client context.
//!
//! Every value is threaded through constructors; there is no process-wide mutable default.

// crates.io
use jose_jwk::Jwk;
// self
use crate::{_prelude::*, error::ConfigError};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://bsky.social";
/// Path joined onto the base URL when no token endpoint is configured.
pub const DEFAULT_TOKEN_PATH: &str = "/oauth/token";

/// Endpoint configuration shared by a session and its token flows.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Base URL of the remote API.
	pub base_url: Url,
	/// OAuth token endpoint used for authorization-code exchanges.
	pub token_endpoint: Option<Url>,
	/// Endpoint used for refresh exchanges; falls back to the token endpoint.
	pub refresh_endpoint: Option<Url>,
}
impl ClientConfig {
	/// Creates a configuration rooted at `base_url`.
	pub fn new(base_url: Url) -> Self {
		Self { base_url, token_endpoint: None, refresh_endpoint: None }
	}

	/// Parses `base_url` and creates a configuration rooted at it.
	pub fn parse(base_url: &str) -> Result<Self, ConfigError> {
		Ok(Self::new(Url::parse(base_url)?))
	}

	/// Overrides the token endpoint.
	pub fn with_token_endpoint(mut self, endpoint: Url) -> Self {
		self.token_endpoint = Some(endpoint);

		self
	}

	/// Overrides the refresh endpoint.
	pub fn with_refresh_endpoint(mut self, endpoint: Url) -> Self {
		self.refresh_endpoint = Some(endpoint);

		self
	}

	/// Resolves the token endpoint, defaulting to `{base_url}/oauth/token`.
	pub fn resolved_token_endpoint(&self) -> Result<Url, ConfigError> {
		match &self.token_endpoint {
			Some(endpoint) => Ok(endpoint.clone()),
			None => Ok(self.base_url.join(DEFAULT_TOKEN_PATH)?),
		}
	}

	/// Resolves the refresh endpoint, defaulting to the token endpoint.
	pub fn resolved_refresh_endpoint(&self) -> Result<Url, ConfigError> {
		match &self.refresh_endpoint {
			Some(endpoint) => Ok(endpoint.clone()),
			None => self.resolved_token_endpoint(),
		}
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL must be a valid absolute URL.")
	}
}

/// OAuth client context used to sign `private_key_jwt` client assertions.
///
/// Every field is optional so a partially configured client surfaces
/// [`ConfigError::MissingClientId`] or [`ConfigError::MissingClientJwk`] when a
/// client-authenticated flow actually runs.
#[derive(Clone, Default)]
pub struct OAuthClient {
	/// OAuth `client_id`, used for `iss` and `sub`.
	pub client_id: Option<String>,
	/// Private P-256 JWK; its `kid` is copied into the assertion header.
	pub jwk: Option<Jwk>,
	/// Assertion audience; defaults to the token endpoint origin.
	pub audience: Option<String>,
}
impl OAuthClient {
	/// Creates a context for `client_id` signed with `jwk`.
	pub fn new(client_id: impl Into<String>, jwk: Jwk) -> Self {
		Self { client_id: Some(client_id.into()), jwk: Some(jwk), audience: None }
	}

	/// Parses the client JWK from its JSON form.
	pub fn from_jwk_json(client_id: impl Into<String>, jwk_json: &str) -> Result<Self, ConfigError> {
		let jwk = serde_json::from_str(jwk_json)
			.map_err(|e| ConfigError::InvalidSigningKey { reason: e.to_string() })?;

		Ok(Self::new(client_id, jwk))
	}

	/// Overrides the assertion audience (the authorization server's issuer/site).
	pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = Some(audience.into());

		self
	}

	/// Returns the audience for assertions sent to `endpoint`.
	pub fn audience_for(&self, endpoint: &Url) -> String {
		self.audience.clone().unwrap_or_else(|| endpoint.origin().ascii_serialization())
	}
}
impl Debug for OAuthClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthClient")
			.field("client_id", &self.client_id)
			.field("jwk_kid", &self.jwk.as_ref().map(|jwk| jwk.prm.kid.as_deref()))
			.field("audience", &self.audience)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn endpoints_default_to_base_url() {
		let config = ClientConfig::default();

		assert_eq!(config.base_url.as_str(), "https://bsky.social/");
		assert_eq!(
			config.resolved_token_endpoint().expect("Token endpoint should resolve.").as_str(),
			"https://bsky.social/oauth/token"
		);
		assert_eq!(
			config.resolved_refresh_endpoint().expect("Refresh endpoint should resolve.").as_str(),
			"https://bsky.social/oauth/token"
		);
	}

	#[test]
	fn explicit_refresh_endpoint_wins() {
		let refresh = Url::parse("https://auth.example.com/refresh")
			.expect("Refresh endpoint fixture should parse.");
		let config = ClientConfig::parse("https://api.example.com")
			.expect("Base URL fixture should parse.")
			.with_refresh_endpoint(refresh.clone());

		assert_eq!(config.resolved_refresh_endpoint().expect("Endpoint should resolve."), refresh);
		assert_eq!(
			config.resolved_token_endpoint().expect("Endpoint should resolve.").as_str(),
			"https://api.example.com/oauth/token"
		);
	}

	#[test]
	fn audience_defaults_to_endpoint_origin() {
		let endpoint = Url::parse("https://auth.example.com:8443/oauth/token")
			.expect("Endpoint fixture should parse.");
		let client = OAuthClient::default();

		assert_eq!(client.audience_for(&endpoint), "https://auth.example.com:8443");
		assert_eq!(
			client.with_audience("https://issuer.example.com").audience_for(&endpoint),
			"https://issuer.example.com"
		);
	}
}
