//! DPoP-aware request dispatch with a single nonce retry.
//!
//! Every attempt signs a fresh proof against the tracker's current nonce. When the server
//! answers `400 use_dpop_nonce`, the dispatcher stores the nonce from that response and tries
//! once more; a second nonce rejection degrades to [`Error::Api`]. All other failures pass
//! straight through so the session layer can decide what to do with them.

// crates.io
use ::http::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	dpop::{Es256Key, NonceTracker, ProofGenerator},
	error::ConfigError,
	http::{HttpTransport, Payload, RequestBody, RequestExecutor},
	obs::{self, RetryReason},
};

/// Request header carrying the proof.
pub const DPOP_HEADER: HeaderName = HeaderName::from_static("dpop");
/// `Authorization` scheme for DPoP-bound access tokens.
pub const DPOP_AUTH_SCHEME: &str = "DPoP";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attempt {
	Initial,
	Retried,
}

/// Composes proof generation, nonce tracking, and request execution.
pub struct DpopDispatcher<C>
where
	C: ?Sized + HttpTransport,
{
	executor: RequestExecutor<C>,
	generator: ProofGenerator,
}
impl<C> DpopDispatcher<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a dispatcher with a fresh nonce tracker.
	pub fn new(key: Es256Key, transport: impl Into<Arc<C>>) -> Self {
		Self::with_nonce_tracker(key, transport, Default::default())
	}

	/// Creates a dispatcher that shares `nonces` with other components.
	pub fn with_nonce_tracker(
		key: Es256Key,
		transport: impl Into<Arc<C>>,
		nonces: Arc<NonceTracker>,
	) -> Self {
		Self {
			executor: RequestExecutor::new(transport),
			generator: ProofGenerator::new(key, nonces),
		}
	}

	/// Returns the proof generator.
	pub fn generator(&self) -> &ProofGenerator {
		&self.generator
	}

	/// Returns the nonce tracker.
	pub fn nonces(&self) -> &Arc<NonceTracker> {
		self.generator.nonces()
	}

	/// Returns the request executor.
	pub fn executor(&self) -> &RequestExecutor<C> {
		&self.executor
	}

	/// Sends a request with a fresh `DPoP` proof, retrying once on a nonce rejection.
	///
	/// When `headers` already carry `Authorization: DPoP <token>`, the proof's `ath` is bound
	/// to that token; otherwise the generator's token context applies.
	pub async fn dispatch(
		&self,
		url: &Url,
		method: &Method,
		mut headers: HeaderMap,
		body: Option<&RequestBody>,
	) -> Result<Payload> {
		let bound_token = bound_access_token(&headers);
		let mut attempt = Attempt::Initial;

		loop {
			let proof = match &bound_token {
				Some(token) => self.generator.generate_for_token(method, url, None, token)?,
				None => self.generator.generate(method, url, None)?,
			};

			headers.insert(DPOP_HEADER, HeaderValue::from_str(&proof).map_err(ConfigError::from)?);

			match self.executor.execute(method, url, &headers, body).await {
				Ok(payload) => {
					self.nonces().update(&payload.headers);

					return Ok(payload);
				},
				Err(Error::NonceRequired { status, headers: response_headers, body: text }) => {
					self.nonces().update(&response_headers);

					if attempt == Attempt::Retried {
						return Err(Error::Api { status, body: text });
					}

					obs::record_retry(RetryReason::Nonce);

					attempt = Attempt::Retried;
				},
				Err(err) => return Err(err),
			}
		}
	}
}
impl<C> Debug for DpopDispatcher<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DpopDispatcher")
			.field("generator", &self.generator)
			.finish_non_exhaustive()
	}
}

/// Builds the `Authorization: DPoP <token>` header value.
pub fn authorization_value(token: &TokenSecret) -> Result<HeaderValue> {
	let mut value = HeaderValue::from_str(&format!("{DPOP_AUTH_SCHEME} {}", token.expose()))
		.map_err(ConfigError::from)?;

	value.set_sensitive(true);

	Ok(value)
}

fn bound_access_token(headers: &HeaderMap) -> Option<TokenSecret> {
	let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
	let (scheme, token) = value.split_once(' ')?;

	scheme.eq_ignore_ascii_case(DPOP_AUTH_SCHEME).then(|| TokenSecret::new(token))
}
