//! Token endpoint flows: single-flight refresh and authorization-code exchange.
//!
//! Both flows POST a JSON form through the session's own [`DpopDispatcher`], so the token
//! endpoint sees the same DPoP key and nonce as API calls. They serialize on the session's
//! refresh guard; a caller that waited behind another refresh reuses the tokens that refresh
//! installed instead of spending the refresh token a second time.
//!
//! [`DpopDispatcher`]: crate::dispatch::DpopDispatcher

// self
use crate::{
	_prelude::*,
	auth::{TokenResponse, TokenSecret},
	dpop::ClientAssertion,
	error::ConfigError,
	http::{HttpTransport, RequestBody},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{self, SessionClient},
};

/// `grant_type` for refresh exchanges.
pub const GRANT_TYPE_REFRESH_TOKEN: &str = "refresh_token";
/// `grant_type` for authorization-code exchanges.
pub const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";

/// Inputs for exchanging an authorization code at the token endpoint.
#[derive(Clone)]
pub struct AuthorizationCodeGrant {
	/// Code returned on the redirect.
	pub code: String,
	/// PKCE verifier matching the challenge sent with the authorization request.
	pub code_verifier: Option<String>,
	/// Redirect URI used for the authorization request.
	pub redirect_uri: Option<Url>,
}
impl AuthorizationCodeGrant {
	/// Creates a grant for `code`.
	pub fn new(code: impl Into<String>) -> Self {
		Self { code: code.into(), code_verifier: None, redirect_uri: None }
	}

	/// Attaches the PKCE verifier.
	pub fn with_code_verifier(mut self, verifier: impl Into<String>) -> Self {
		self.code_verifier = Some(verifier.into());

		self
	}

	/// Attaches the redirect URI.
	pub fn with_redirect_uri(mut self, redirect_uri: Url) -> Self {
		self.redirect_uri = Some(redirect_uri);

		self
	}

	fn form(&self) -> JsonMap<String, JsonValue> {
		let mut form = JsonMap::new();

		session::form_field(&mut form, "grant_type", GRANT_TYPE_AUTHORIZATION_CODE);
		session::form_field(&mut form, "code", self.code.as_str());

		if let Some(verifier) = &self.code_verifier {
			session::form_field(&mut form, "code_verifier", verifier.as_str());
		}
		if let Some(redirect_uri) = &self.redirect_uri {
			session::form_field(&mut form, "redirect_uri", redirect_uri.as_str());
		}

		form
	}
}
impl Debug for AuthorizationCodeGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationCodeGrant")
			.field("code", &"<redacted>")
			.field("code_verifier_set", &self.code_verifier.is_some())
			.field("redirect_uri", &self.redirect_uri.as_ref().map(Url::as_str))
			.finish()
	}
}

impl<C> SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Exchanges the held refresh token for a new token pair and installs it.
	///
	/// Concurrent callers are serialized; each call performs its own exchange. Failures
	/// surface as [`Error::RefreshToken`] and leave the held tokens untouched.
	pub async fn refresh_access_token(&self) -> Result<TokenResponse> {
		let _singleflight = self.refresh_guard.lock().await;

		self.refresh_locked().await
	}

	/// Exchanges an authorization code (plus optional PKCE verifier) and installs the tokens.
	pub async fn exchange_authorization_code(
		&self,
		grant: AuthorizationCodeGrant,
	) -> Result<TokenResponse> {
		const KIND: FlowKind = FlowKind::AuthorizationCode;

		let span = FlowSpan::new(KIND, "exchange_authorization_code");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let _singleflight = self.refresh_guard.lock().await;
				let endpoint = self.config.resolved_token_endpoint()?;
				let response = self
					.token_request(&endpoint, grant.form())
					.await
					.map_err(Error::into_refresh_error)?;

				self.install_tokens(&response);

				Ok(response)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Refreshes after `stale` was rejected as expired.
	///
	/// If another caller replaced the access token while this one waited on the guard, the
	/// replacement is reused and no exchange is made.
	pub(super) async fn refresh_after_expiry(&self, stale: Option<&TokenSecret>) -> Result<()> {
		let _singleflight = self.refresh_guard.lock().await;

		if self.access_token().as_ref() != stale {
			self.refresh_metrics.record_reuse();

			return Ok(());
		}

		self.refresh_locked().await.map(|_| ())
	}

	/// Performs one refresh exchange; the caller must hold the refresh guard.
	async fn refresh_locked(&self) -> Result<TokenResponse> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_access_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span
			.instrument(async {
				let refresh_token =
					self.refresh_token().ok_or(ConfigError::MissingRefreshToken)?;
				let endpoint = self.config.resolved_refresh_endpoint()?;
				let mut form = JsonMap::new();

				session::form_field(&mut form, "grant_type", GRANT_TYPE_REFRESH_TOKEN);
				session::form_field(&mut form, "refresh_token", refresh_token.expose());

				let response = self
					.token_request(&endpoint, form)
					.await
					.map_err(Error::into_refresh_error)?;

				self.install_tokens(&response);

				Ok(response)
			})
			.await;

		match &result {
			Ok(_) => {
				self.refresh_metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(_) => {
				self.refresh_metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	/// POSTs `form` (plus the client assertion, when configured) to `endpoint`.
	///
	/// The assertion is addressed to the token endpoint even when `endpoint` is a separate
	/// refresh endpoint.
	async fn token_request(
		&self,
		endpoint: &Url,
		mut form: JsonMap<String, JsonValue>,
	) -> Result<TokenResponse> {
		if let Some(client) = &self.oauth_client {
			let token_endpoint = self.config.resolved_token_endpoint()?;

			ClientAssertion::sign(client, &token_endpoint)?.append_to(&mut form);
		}

		let body = RequestBody::from(form);
		let payload =
			self.dispatcher.dispatch(endpoint, &Method::POST, HeaderMap::new(), Some(&body)).await?;

		TokenResponse::from_payload(payload.status, payload.body)
	}
}
