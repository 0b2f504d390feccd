//! Per-request DPoP proof generation.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	dpop::{ALG_ES256, Es256Key, JwsHeader, NonceTracker, ProofClaims, jwt},
};

/// `typ` header value for DPoP proofs.
pub const JWT_HEADER_TYP_DPOP: &str = "dpop+jwt";
/// Proof validity window in seconds.
pub const PROOF_LIFETIME_SECS: i64 = 120;

/// Signs a fresh DPoP proof for every outbound request.
///
/// The generator reads the shared [`NonceTracker`] and its own access-token context; neither
/// lock is held while signing, and ES256 signing itself needs no serialization, so concurrent
/// callers never wait on each other beyond the brief nonce/token reads.
#[derive(Debug)]
pub struct ProofGenerator {
	key: Es256Key,
	nonces: Arc<NonceTracker>,
	access_token: RwLock<Option<TokenSecret>>,
}
impl ProofGenerator {
	/// Creates a generator that signs with `key` and reads nonces from `nonces`.
	pub fn new(key: Es256Key, nonces: Arc<NonceTracker>) -> Self {
		Self { key, nonces, access_token: RwLock::new(None) }
	}

	/// Seeds the access-token context used for `ath`.
	pub fn with_access_token(self, access_token: impl Into<TokenSecret>) -> Self {
		self.set_access_token(Some(access_token.into()));

		self
	}

	/// Replaces the access-token context used for `ath`.
	pub fn set_access_token(&self, access_token: Option<TokenSecret>) {
		*self.access_token.write() = access_token;
	}

	/// Returns the signing key.
	pub fn key(&self) -> &Es256Key {
		&self.key
	}

	/// Returns the nonce tracker this generator reads.
	pub fn nonces(&self) -> &Arc<NonceTracker> {
		&self.nonces
	}

	/// Builds a proof for `method` + `url`, bound to the configured access token.
	///
	/// `nonce` defaults to the tracker's current value.
	pub fn generate(&self, method: &Method, url: &Url, nonce: Option<&str>) -> Result<String> {
		let ath = self.access_token.read().as_ref().map(TokenSecret::hash_for_dpop);

		self.sign(method, url, nonce, ath)
	}

	/// Builds a proof bound to `access_token` instead of the configured context.
	pub fn generate_for_token(
		&self,
		method: &Method,
		url: &Url,
		nonce: Option<&str>,
		access_token: &TokenSecret,
	) -> Result<String> {
		self.sign(method, url, nonce, Some(access_token.hash_for_dpop()))
	}

	fn sign(
		&self,
		method: &Method,
		url: &Url,
		nonce: Option<&str>,
		ath: Option<String>,
	) -> Result<String> {
		let iat = jwt::unix_now();
		let claims = ProofClaims {
			jti: jwt::generate_jti(),
			htm: method.as_str().to_owned(),
			htu: url.as_str().to_owned(),
			iat,
			exp: iat + PROOF_LIFETIME_SECS,
			ath,
			nonce: nonce.map(str::to_owned).or_else(|| self.nonces.current()),
		};
		let header = JwsHeader {
			typ: JWT_HEADER_TYP_DPOP.into(),
			alg: ALG_ES256.into(),
			jwk: Some(self.key.public_jwk().clone()),
			kid: None,
		};

		Ok(jwt::sign_compact(&self.key, &header, &claims)?)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::dpop::CompactJws;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("URL fixture should parse.")
	}

	#[test]
	fn tracker_nonce_is_used_unless_overridden() {
		let nonces = Arc::new(NonceTracker::with_nonce("tracked"));
		let generator = ProofGenerator::new(Es256Key::generate(), nonces);
		let target = url("https://api.example.com/xrpc/app.bsky.actor.getProfile");
		let tracked = generator.generate(&Method::GET, &target, None).expect("Proof should sign.");
		let explicit =
			generator.generate(&Method::GET, &target, Some("explicit")).expect("Proof should sign.");
		let tracked = CompactJws::parse(&tracked)
			.and_then(|jws| jws.claims::<ProofClaims>())
			.expect("Claims should decode.");
		let explicit = CompactJws::parse(&explicit)
			.and_then(|jws| jws.claims::<ProofClaims>())
			.expect("Claims should decode.");

		assert_eq!(tracked.nonce.as_deref(), Some("tracked"));
		assert_eq!(explicit.nonce.as_deref(), Some("explicit"));
		assert_ne!(tracked.jti, explicit.jti);
	}

	#[test]
	fn explicit_token_binding_overrides_context() {
		let generator = ProofGenerator::new(Es256Key::generate(), Default::default())
			.with_access_token("context-token");
		let bound = TokenSecret::new("request-token");
		let proof = generator
			.generate_for_token(&Method::POST, &url("https://api.example.com/x"), None, &bound)
			.expect("Proof should sign.");
		let claims = CompactJws::parse(&proof)
			.and_then(|jws| jws.claims::<ProofClaims>())
			.expect("Claims should decode.");

		assert_eq!(claims.ath, Some(bound.hash_for_dpop()));
		assert_eq!(claims.nonce, None);
	}
}
