//! `private_key_jwt` client assertions (RFC 7523) for token endpoint calls.

// self
use crate::{
	_prelude::*,
	config::OAuthClient,
	dpop::{ALG_ES256, AssertionClaims, Es256Key, JwsHeader, jwt},
	error::ConfigError,
};

/// `client_assertion_type` for JWT bearer client authentication.
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
/// Assertion validity window in seconds.
pub const ASSERTION_LIFETIME_SECS: i64 = 300;

/// A signed client assertion ready to be merged into a token request body.
#[derive(Clone)]
pub struct ClientAssertion {
	/// Client id the assertion was issued for.
	pub client_id: String,
	/// Compact signed JWT.
	pub assertion: String,
}
impl ClientAssertion {
	/// Signs a fresh assertion for `client`, addressed to the server behind `token_endpoint`.
	pub fn sign(client: &OAuthClient, token_endpoint: &Url) -> Result<Self, ConfigError> {
		let client_id = client.client_id.as_deref().ok_or(ConfigError::MissingClientId)?;
		let jwk = client.jwk.as_ref().ok_or(ConfigError::MissingClientJwk)?;
		let key = Es256Key::from_jwk(jwk)?;
		let header = JwsHeader {
			typ: "jwt".into(),
			alg: ALG_ES256.into(),
			jwk: None,
			kid: jwk.prm.kid.clone(),
		};
		let iat = jwt::unix_now();
		let claims = AssertionClaims {
			iss: client_id.to_owned(),
			sub: client_id.to_owned(),
			aud: client.audience_for(token_endpoint),
			jti: jwt::generate_jti(),
			iat,
			exp: iat + ASSERTION_LIFETIME_SECS,
		};
		let assertion = jwt::sign_compact(&key, &header, &claims)?;

		Ok(Self { client_id: client_id.to_owned(), assertion })
	}

	/// Adds `client_id`, `client_assertion_type`, and `client_assertion` to `body`.
	pub fn append_to(&self, body: &mut JsonMap<String, JsonValue>) {
		body.insert("client_id".into(), self.client_id.clone().into());
		body.insert("client_assertion_type".into(), CLIENT_ASSERTION_TYPE.into());
		body.insert("client_assertion".into(), self.assertion.clone().into());
	}
}
impl Debug for ClientAssertion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientAssertion")
			.field("client_id", &self.client_id)
			.field("assertion", &"<redacted>")
			.finish()
	}
}
