//! Compact JWS (ES256) encoding and the header/claim sets this crate signs.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jose_jwk::{Jwk, crypto};
use p256::ecdsa::{Signature, VerifyingKey, signature::Verifier};
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, dpop::Es256Key, error::ConfigError};

/// JOSE `alg` value for ECDSA P-256 + SHA-256.
pub const ALG_ES256: &str = "ES256";

/// Protected header shared by DPoP proofs and client assertions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
	/// Token type (`dpop+jwt` or `jwt`).
	pub typ: String,
	/// Signature algorithm.
	pub alg: String,
	/// Embedded public key (DPoP proofs only).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub jwk: Option<Jwk>,
	/// Key identifier (client assertions only).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kid: Option<String>,
}

/// Claims carried by a DPoP proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofClaims {
	/// Unique proof identifier.
	pub jti: String,
	/// HTTP method of the authorized request.
	pub htm: String,
	/// HTTP target URL of the authorized request.
	pub htu: String,
	/// Issued-at (Unix seconds).
	pub iat: i64,
	/// Expiry (Unix seconds).
	pub exp: i64,
	/// Access token hash.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ath: Option<String>,
	/// Server-issued replay nonce.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<String>,
}

/// Claims carried by a `private_key_jwt` client assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
	/// Issuer (the client id).
	pub iss: String,
	/// Subject (the client id).
	pub sub: String,
	/// Audience (the authorization server).
	pub aud: String,
	/// Unique assertion identifier.
	pub jti: String,
	/// Issued-at (Unix seconds).
	pub iat: i64,
	/// Expiry (Unix seconds).
	pub exp: i64,
}

/// Borrowed view over the three segments of a compact JWS.
#[derive(Clone, Copy, Debug)]
pub struct CompactJws<'a> {
	header: &'a str,
	payload: &'a str,
	signature: &'a str,
}
impl<'a> CompactJws<'a> {
	/// Splits `token` into its segments; returns `None` unless there are exactly three.
	pub fn parse(token: &'a str) -> Option<Self> {
		let mut parts = token.split('.');
		let header = parts.next()?;
		let payload = parts.next()?;
		let signature = parts.next()?;

		if parts.next().is_some() {
			return None;
		}

		Some(Self { header, payload, signature })
	}

	/// Decodes the protected header.
	pub fn header<T>(&self) -> Option<T>
	where
		T: DeserializeOwned,
	{
		decode_segment(self.header)
	}

	/// Decodes the payload.
	pub fn claims<T>(&self) -> Option<T>
	where
		T: DeserializeOwned,
	{
		decode_segment(self.payload)
	}

	/// Verifies the ES256 signature against `key`.
	pub fn verify(&self, key: &VerifyingKey) -> bool {
		let Ok(raw) = URL_SAFE_NO_PAD.decode(self.signature) else {
			return false;
		};
		let Ok(signature) = Signature::from_slice(&raw) else {
			return false;
		};
		let message = format!("{}.{}", self.header, self.payload);

		key.verify(message.as_bytes(), &signature).is_ok()
	}

	/// Verifies the signature against the public JWK embedded in the header.
	pub fn verify_embedded(&self) -> bool {
		let Some(header) = self.header::<JwsHeader>() else {
			return false;
		};
		let Some(jwk) = header.jwk else {
			return false;
		};

		match crypto::Key::try_from(&jwk.key) {
			Ok(crypto::Key::P256(crypto::Kind::Public(public))) =>
				self.verify(&VerifyingKey::from(public)),
			_ => false,
		}
	}
}

/// Signs `header.claims` with `key`, returning the compact serialization.
pub fn sign_compact<C>(key: &Es256Key, header: &JwsHeader, claims: &C) -> Result<String, ConfigError>
where
	C: Serialize,
{
	let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).map_err(ConfigError::JwtEncode)?);
	let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).map_err(ConfigError::JwtEncode)?);
	let signature = key.sign(format!("{header}.{payload}").as_bytes());

	Ok(format!("{header}.{payload}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes())))
}

/// Returns a fresh 128-bit identifier for `jti` claims.
pub(crate) fn generate_jti() -> String {
	URL_SAFE_NO_PAD.encode(rand::random::<[u8; 16]>())
}

/// Current Unix time in seconds.
pub(crate) fn unix_now() -> i64 {
	OffsetDateTime::now_utc().unix_timestamp()
}

fn decode_segment<T>(segment: &str) -> Option<T>
where
	T: DeserializeOwned,
{
	let raw = URL_SAFE_NO_PAD.decode(segment).ok()?;

	serde_json::from_slice(&raw).ok()
}
