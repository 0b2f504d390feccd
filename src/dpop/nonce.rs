//! Server-issued replay nonce shared by every proof a dispatcher signs.

// self
use crate::_prelude::*;

/// Response header carrying the next nonce.
pub const DPOP_NONCE_HEADER: &str = "dpop-nonce";

/// Holds the most recent `DPoP-Nonce` value; the latest write wins.
#[derive(Debug, Default)]
pub struct NonceTracker(RwLock<Option<String>>);
impl NonceTracker {
	/// Creates a tracker seeded with `nonce`.
	pub fn with_nonce(nonce: impl Into<String>) -> Self {
		Self(RwLock::new(Some(nonce.into())))
	}

	/// Returns the current nonce, if the server has issued one.
	pub fn current(&self) -> Option<String> {
		self.0.read().clone()
	}

	/// Replaces the current nonce with the first `dpop-nonce` header value.
	///
	/// Returns `true` when the header was present and stored; absence is a no-op.
	pub fn update(&self, headers: &HeaderMap) -> bool {
		let Some(value) = headers.get(DPOP_NONCE_HEADER).and_then(|v| v.to_str().ok()) else {
			return false;
		};

		self.set(value);

		true
	}

	/// Overwrites the current nonce.
	pub fn set(&self, nonce: impl Into<String>) {
		*self.0.write() = Some(nonce.into());
	}
}
