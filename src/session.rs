//! Session client: access-token injection, refresh-and-retry, and token exchanges.
//!
//! A [`SessionClient`] owns one DPoP key, one nonce tracker, and one access/refresh token
//! pair. [`SessionClient::request`] sends `Authorization: DPoP <access token>` through the
//! [`DpopDispatcher`]; when the server reports an expired token the session refreshes once
//! (single-flight across concurrent callers) and replays the request once.

mod metrics;
mod refresh;

pub use metrics::RefreshMetrics;
pub use refresh::*;

// crates.io
use ::http::header::AUTHORIZATION;
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenResponse, TokenSecret},
	config::{ClientConfig, OAuthClient},
	dispatch::{self, DPOP_HEADER, DpopDispatcher},
	dpop::Es256Key,
	http::{HttpTransport, Payload, RequestBody},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, RetryReason},
};

#[cfg(feature = "reqwest")]
/// Session specialized for the crate's default reqwest transport.
pub type ReqwestSession = SessionClient<ReqwestHttpClient>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attempt {
	Initial,
	Retried,
}

/// One authenticated API call.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Target URL before query parameters are merged.
	pub url: Url,
	/// Query parameters appended to `url`.
	pub params: Vec<(String, String)>,
	/// Optional request body.
	pub body: Option<RequestBody>,
	/// Caller headers; `Authorization` and `DPoP` are reserved and replaced.
	pub headers: HeaderMap,
}
impl ApiRequest {
	/// Creates a request for `method` + `url`.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, params: Vec::new(), body: None, headers: HeaderMap::new() }
	}

	/// Creates a `GET` request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Creates a `POST` request.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Appends one query parameter.
	pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.push((key.into(), value.into()));

		self
	}

	/// Appends several query parameters.
	pub fn with_params<I, K, V>(mut self, params: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.params.extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));

		self
	}

	/// Sets the request body.
	pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `value` as the JSON request body.
	pub fn with_json<T>(self, value: &T) -> Result<Self>
	where
		T: Serialize,
	{
		Ok(self.with_body(RequestBody::json(value)?))
	}

	/// Sets a caller header, replacing any previous value.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Returns `url` with `params` merged into its query string.
	pub fn target_url(&self) -> Url {
		let mut url = self.url.clone();

		if !self.params.is_empty() {
			url.query_pairs_mut().extend_pairs(&self.params);
		}

		url
	}
}

/// DPoP session bound to one key, one nonce tracker, and one token pair.
pub struct SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	dispatcher: DpopDispatcher<C>,
	config: ClientConfig,
	oauth_client: Option<OAuthClient>,
	tokens: RwLock<TokenPair>,
	refresh_guard: AsyncMutex<()>,
	refresh_metrics: Arc<RefreshMetrics>,
}
impl<C> SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a session that reuses the caller-provided transport.
	pub fn with_http_client(
		config: ClientConfig,
		key: Es256Key,
		tokens: TokenPair,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		let dispatcher = DpopDispatcher::new(key, http_client);

		dispatcher.generator().set_access_token(tokens.access_token.clone());

		Self {
			dispatcher,
			config,
			oauth_client: None,
			tokens: RwLock::new(tokens),
			refresh_guard: AsyncMutex::new(()),
			refresh_metrics: Default::default(),
		}
	}

	/// Attaches the OAuth client context used for `private_key_jwt` assertions.
	pub fn with_oauth_client(mut self, client: OAuthClient) -> Self {
		self.oauth_client = Some(client);

		self
	}

	/// Seeds the nonce tracker, e.g. with a nonce obtained during authorization.
	pub fn with_nonce(self, nonce: impl Into<String>) -> Self {
		self.dispatcher.nonces().set(nonce);

		self
	}

	/// Returns the endpoint configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Returns the OAuth client context, if configured.
	pub fn oauth_client(&self) -> Option<&OAuthClient> {
		self.oauth_client.as_ref()
	}

	/// Returns the dispatcher (and through it the generator and nonce tracker).
	pub fn dispatcher(&self) -> &DpopDispatcher<C> {
		&self.dispatcher
	}

	/// Returns the DPoP signing key.
	pub fn dpop_key(&self) -> &Es256Key {
		self.dispatcher.generator().key()
	}

	/// Returns the current replay nonce.
	pub fn nonce(&self) -> Option<String> {
		self.dispatcher.nonces().current()
	}

	/// Returns a snapshot of the held token pair.
	pub fn tokens(&self) -> TokenPair {
		self.tokens.read().clone()
	}

	/// Returns the held access token.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.tokens.read().access_token.clone()
	}

	/// Returns the held refresh token.
	pub fn refresh_token(&self) -> Option<TokenSecret> {
		self.tokens.read().refresh_token.clone()
	}

	/// Replaces the held token pair wholesale.
	pub fn set_tokens(&self, tokens: TokenPair) {
		let mut held = self.tokens.write();

		self.dispatcher.generator().set_access_token(tokens.access_token.clone());

		*held = tokens;
	}

	/// Returns the shared refresh counters.
	pub fn refresh_metrics(&self) -> &Arc<RefreshMetrics> {
		&self.refresh_metrics
	}

	/// Sends an authenticated request and returns the parsed JSON body.
	///
	/// An expired access token triggers at most one refresh and one replay; without a refresh
	/// token the [`Error::TokenExpired`] surfaces immediately.
	pub async fn request(&self, request: ApiRequest) -> Result<JsonValue> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.send_with_refresh(&request)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result.map(|payload| payload.body)
	}

	/// Sends an authenticated `GET`.
	pub async fn get(&self, url: Url) -> Result<JsonValue> {
		self.request(ApiRequest::get(url)).await
	}

	/// Sends an authenticated `POST` with a JSON body.
	pub async fn post_json<T>(&self, url: Url, body: &T) -> Result<JsonValue>
	where
		T: Serialize,
	{
		self.request(ApiRequest::post(url).with_json(body)?).await
	}

	async fn send_with_refresh(&self, request: &ApiRequest) -> Result<Payload> {
		let url = request.target_url();
		let mut attempt = Attempt::Initial;

		loop {
			let access_token = self.access_token();
			let headers = reserved_headers(&request.headers, access_token.as_ref())?;
			let result = self
				.dispatcher
				.dispatch(&url, &request.method, headers, request.body.as_ref())
				.await;

			match result {
				Err(Error::TokenExpired { body }) if attempt == Attempt::Initial => {
					if !self.tokens.read().can_refresh() {
						return Err(Error::TokenExpired { body });
					}

					self.refresh_after_expiry(access_token.as_ref()).await?;

					obs::record_retry(RetryReason::TokenExpired);

					attempt = Attempt::Retried;
				},
				result => return result,
			}
		}
	}

	/// Installs the tokens from a token endpoint response in one write.
	fn install_tokens(&self, response: &TokenResponse) {
		let mut held = self.tokens.write();
		let rotated =
			held.rotated(response.access_token.clone(), response.refresh_token.clone());

		self.dispatcher.generator().set_access_token(rotated.access_token.clone());

		*held = rotated;
	}
}
#[cfg(feature = "reqwest")]
impl SessionClient<ReqwestHttpClient> {
	/// Creates a session backed by a default reqwest transport.
	pub fn new(config: ClientConfig, key: Es256Key, tokens: TokenPair) -> Self {
		Self::with_http_client(config, key, tokens, ReqwestHttpClient::default())
	}
}
impl<C> Debug for SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionClient")
			.field("config", &self.config)
			.field("oauth_client", &self.oauth_client)
			.field("tokens", &*self.tokens.read())
			.finish_non_exhaustive()
	}
}

/// Copies caller headers, dropping reserved names and injecting the access token.
fn reserved_headers(caller: &HeaderMap, access_token: Option<&TokenSecret>) -> Result<HeaderMap> {
	let mut headers = caller.clone();

	headers.remove(DPOP_HEADER);
	headers.remove(AUTHORIZATION);

	if let Some(token) = access_token {
		headers.insert(AUTHORIZATION, dispatch::authorization_value(token)?);
	}

	Ok(headers)
}

/// Merges `key=value` into a JSON form body.
fn form_field(form: &mut JsonMap<String, JsonValue>, key: &str, value: impl Into<String>) {
	form.insert(key.to_owned(), JsonValue::String(value.into()));
}
