//! ES256 signing keys and their public JWK form.

// crates.io
use jose_jwk::{Jwk, Key, crypto};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey, signature::Signer};
use rand_core::OsRng;
// self
use crate::{_prelude::*, error::ConfigError};

/// P-256 private key used for ES256 signatures.
///
/// The public half is exported once at construction; the private half never leaves the
/// instance.
#[derive(Clone)]
pub struct Es256Key {
	signing: SigningKey,
	public_jwk: Jwk,
}
impl Es256Key {
	/// Generates a fresh key from the OS random source.
	pub fn generate() -> Self {
		Self::from_signing_key(SigningKey::random(&mut OsRng))
	}

	/// Wraps an existing `p256` signing key.
	pub fn from_signing_key(signing: SigningKey) -> Self {
		let public = p256::PublicKey::from(signing.verifying_key());
		let public_jwk =
			Jwk { key: Key::from(&crypto::Key::from(public)), prm: Default::default() };

		Self { signing, public_jwk }
	}

	/// Loads the private key from an EC P-256 JWK carrying `d`.
	pub fn from_jwk(jwk: &Jwk) -> Result<Self, ConfigError> {
		let key = crypto::Key::try_from(&jwk.key)
			.map_err(|e| ConfigError::InvalidSigningKey { reason: format!("{e:?}") })?;

		match key {
			crypto::Key::P256(crypto::Kind::Secret(secret)) =>
				Ok(Self::from_signing_key(SigningKey::from(secret))),
			crypto::Key::P256(crypto::Kind::Public(_)) => Err(ConfigError::MissingSigningKey),
			_ => Err(ConfigError::InvalidSigningKey { reason: "expected an EC P-256 key".into() }),
		}
	}

	/// Parses [`Es256Key::from_jwk`] input from its JSON form.
	pub fn from_jwk_json(json: &str) -> Result<Self, ConfigError> {
		let jwk: Jwk = serde_json::from_str(json)
			.map_err(|e| ConfigError::InvalidSigningKey { reason: e.to_string() })?;

		Self::from_jwk(&jwk)
	}

	/// Returns the public key as a JWK (no private parameters).
	pub fn public_jwk(&self) -> &Jwk {
		&self.public_jwk
	}

	/// Returns the verifying half of the key.
	pub fn verifying_key(&self) -> &VerifyingKey {
		self.signing.verifying_key()
	}

	pub(crate) fn sign(&self, message: &[u8]) -> Signature {
		self.signing.sign(message)
	}
}
impl Debug for Es256Key {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Es256Key").field("public_jwk", &self.public_jwk).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn public_jwk_omits_private_parameter() {
		let key = Es256Key::generate();
		let json = serde_json::to_value(key.public_jwk()).expect("JWK should serialize.");

		assert_eq!(json["kty"], "EC");
		assert_eq!(json["crv"], "P-256");
		assert!(json.get("x").is_some());
		assert!(json.get("y").is_some());
		assert!(json.get("d").is_none());
	}

	#[test]
	fn public_only_jwk_is_missing_signing_key() {
		let key = Es256Key::generate();
		let err = Es256Key::from_jwk(key.public_jwk())
			.expect_err("A public JWK cannot be used for signing.");

		assert!(matches!(err, ConfigError::MissingSigningKey));
	}

	#[test]
	fn malformed_jwk_json_is_invalid() {
		let err = Es256Key::from_jwk_json("{\"kty\":\"oct\"}")
			.expect_err("Symmetric keys are not ES256 keys.");

		assert!(matches!(err, ConfigError::InvalidSigningKey { .. }));
	}
}
