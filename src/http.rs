//! Transport seam and the request executor.
//!
//! [`HttpTransport`] is the crate's only dependency on an HTTP stack: it sends one fully
//! built request and hands back status, headers, and body bytes. [`RequestExecutor`] sits
//! on top of it, applying the JSON defaults and mapping each response to a [`Payload`] or a
//! typed [`Error`]. Neither layer retries; retry policy lives in
//! [`DpopDispatcher`](crate::dispatch::DpopDispatcher) and
//! [`SessionClient`](crate::session::SessionClient).

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use ::http::header::{ACCEPT, CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Request type handed to transports.
pub type HttpRequest = ::http::Request<Vec<u8>>;
/// Response type returned by transports.
pub type HttpResponse = ::http::Response<Vec<u8>>;
/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a, E> = Pin<Box<dyn Future<Output = Result<HttpResponse, E>> + 'a + Send>>;

/// Default `Content-Type`/`Accept` value.
pub const APPLICATION_JSON: &str = "application/json";
/// `error` code a server returns when the proof lacks a current nonce.
pub const USE_DPOP_NONCE: &str = "use_dpop_nonce";
/// `error` code a server returns when the access token has expired.
pub const TOKEN_EXPIRED_ERROR: &str = "TokenExpiredError";

/// Abstraction over HTTP transports capable of sending one request.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by
/// the executor of every session, and the returned future must be `Send` so callers can
/// drive requests from any executor thread. Timeouts, TLS, and connection reuse are the
/// transport's own policy.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends `request` and resolves with the raw response.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError>;

	/// Maps a transport failure into a client [`Error`].
	fn map_transport_error(&self, error: Self::TransportError) -> Error {
		TransportError::network(error).into()
	}
}

/// Outbound request body.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
	/// Structured body serialized to JSON before sending.
	Json(JsonValue),
	/// Raw bytes sent unmodified; callers supply `Content-Type` themselves.
	Bytes(Vec<u8>),
}
impl RequestBody {
	/// Builds a JSON body from any serializable value.
	pub fn json<T>(value: &T) -> Result<Self>
	where
		T: Serialize,
	{
		Ok(Self::Json(serde_json::to_value(value).map_err(ConfigError::BodyEncode)?))
	}

	fn encode(&self) -> Result<Vec<u8>> {
		match self {
			Self::Json(value) => Ok(serde_json::to_vec(value).map_err(ConfigError::BodyEncode)?),
			Self::Bytes(bytes) => Ok(bytes.clone()),
		}
	}
}
impl From<JsonValue> for RequestBody {
	fn from(value: JsonValue) -> Self {
		Self::Json(value)
	}
}
impl From<JsonMap<String, JsonValue>> for RequestBody {
	fn from(value: JsonMap<String, JsonValue>) -> Self {
		Self::Json(JsonValue::Object(value))
	}
}
impl From<Vec<u8>> for RequestBody {
	fn from(value: Vec<u8>) -> Self {
		Self::Bytes(value)
	}
}

/// Successful response: status, headers, and the parsed JSON body.
#[derive(Clone, Debug)]
pub struct Payload {
	/// HTTP status (always 2xx).
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Parsed body; an empty body parses to `null`.
	pub body: JsonValue,
}

/// Sends single requests through an [`HttpTransport`] and classifies the responses.
#[derive(Debug)]
pub struct RequestExecutor<C>
where
	C: ?Sized + HttpTransport,
{
	transport: Arc<C>,
}
impl<C> RequestExecutor<C>
where
	C: ?Sized + HttpTransport,
{
	/// Wraps `transport`.
	pub fn new(transport: impl Into<Arc<C>>) -> Self {
		Self { transport: transport.into() }
	}

	/// Returns the underlying transport.
	pub fn transport(&self) -> &Arc<C> {
		&self.transport
	}

	/// Sends one request and maps the response.
	///
	/// `Content-Type` and `Accept` default to `application/json`; any value present in
	/// `headers` wins.
	pub async fn execute(
		&self,
		method: &Method,
		url: &Url,
		headers: &HeaderMap,
		body: Option<&RequestBody>,
	) -> Result<Payload> {
		let bytes = match body {
			Some(body) => body.encode()?,
			None => Vec::new(),
		};
		let mut request = ::http::Request::builder()
			.method(method.clone())
			.uri(url.as_str())
			.body(bytes)
			.map_err(ConfigError::from)?;

		*request.headers_mut() = with_json_defaults(headers);

		let response = self
			.transport
			.send(request)
			.await
			.map_err(|e| self.transport.map_transport_error(e))?;

		classify(response)
	}
}
impl<C> Clone for RequestExecutor<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { transport: Arc::clone(&self.transport) }
	}
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	message: Option<String>,
}

fn with_json_defaults(headers: &HeaderMap) -> HeaderMap {
	let mut merged = headers.clone();

	merged.entry(CONTENT_TYPE).or_insert(HeaderValue::from_static(APPLICATION_JSON));
	merged.entry(ACCEPT).or_insert(HeaderValue::from_static(APPLICATION_JSON));

	merged
}

fn classify(response: HttpResponse) -> Result<Payload> {
	let (parts, body) = response.into_parts();
	let status = parts.status;

	if status.is_success() {
		let body = parse_json(status, &body)?;

		return Ok(Payload { status, headers: parts.headers, body });
	}

	let text = String::from_utf8_lossy(&body).into_owned();
	let ErrorBody { error, message } = serde_json::from_slice(&body).unwrap_or_default();

	Err(match (status.as_u16(), error.as_deref()) {
		(400, Some(USE_DPOP_NONCE)) =>
			Error::NonceRequired { status: 400, headers: parts.headers, body: text },
		(401, Some(TOKEN_EXPIRED_ERROR)) => Error::TokenExpired { body: text },
		(401, _) =>
			Error::Auth { error: error.unwrap_or_else(|| text.clone()), message, body: text },
		(status, _) => Error::Api { status, body: text },
	})
}

fn parse_json(status: StatusCode, body: &[u8]) -> Result<JsonValue> {
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(JsonValue::Null);
	}

	let mut de = serde_json::Deserializer::from_slice(body);
	let value = serde_path_to_error::deserialize(&mut de).map_err(|e| Error::parse(status, e))?;

	de.end().map_err(|source| Error::Parse {
		path: ".".into(),
		source,
		status: status.as_u16(),
	})?;

	Ok(value)
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn send(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
		Box::pin(async move {
			let response = self.0.execute(request.try_into()?).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok::<_, ReqwestError>(response_new)
		})
	}

	fn map_transport_error(&self, error: Self::TransportError) -> Error {
		if error.is_builder() {
			return ConfigError::from(error).into();
		}

		TransportError::from(error).into()
	}
}
