//! Access/refresh token pair held by a session.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access and refresh tokens that are always replaced together.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenPair {
	/// Access token sent as `Authorization: DPoP <token>`.
	pub access_token: Option<TokenSecret>,
	/// Refresh token; absence disables refresh-and-retry.
	pub refresh_token: Option<TokenSecret>,
}
impl TokenPair {
	/// Creates a pair holding only an access token.
	pub fn new(access_token: impl Into<TokenSecret>) -> Self {
		Self { access_token: Some(access_token.into()), refresh_token: None }
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<TokenSecret>) -> Self {
		self.refresh_token = Some(refresh_token.into());

		self
	}

	/// Returns `true` when a refresh token is held.
	pub fn can_refresh(&self) -> bool {
		self.refresh_token.is_some()
	}

	/// Builds the pair that replaces `self` after a token endpoint response.
	///
	/// Providers that do not rotate refresh tokens omit `refresh_token`; the current one is
	/// kept in that case.
	pub fn rotated(&self, access_token: TokenSecret, refresh_token: Option<TokenSecret>) -> Self {
		Self {
			access_token: Some(access_token),
			refresh_token: refresh_token.or_else(|| self.refresh_token.clone()),
		}
	}
}
impl Debug for TokenPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenPair")
			.field("access_token_set", &self.access_token.is_some())
			.field("refresh_token_set", &self.refresh_token.is_some())
			.finish()
	}
}
