//! Shared fixtures for integration tests: a scripted in-process transport.

#![allow(dead_code)]

// std
use std::{collections::VecDeque, sync::Arc};
// crates.io
use dpop_client::{
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	http_types::{HeaderMap, Method, StatusCode},
};
use parking_lot::Mutex;
use serde_json::Value;

/// Request as observed by [`ScriptedTransport`].
#[derive(Clone, Debug)]
pub struct RecordedRequest {
	pub method: Method,
	pub url: String,
	pub headers: HeaderMap,
	pub body: Vec<u8>,
}
impl RecordedRequest {
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}

	pub fn json(&self) -> Value {
		serde_json::from_slice(&self.body).expect("Recorded request body should be JSON.")
	}

	pub fn path(&self) -> String {
		url::Url::parse(&self.url).expect("Recorded URL should parse.").path().to_owned()
	}
}

/// Raised once a queued script runs out of responses.
#[derive(Debug, thiserror::Error)]
#[error("Scripted transport has no response left for {0}.")]
pub struct ScriptExhausted(pub String);

type Responder = dyn Fn(&RecordedRequest) -> Option<HttpResponse> + Send + Sync;

/// Transport answering from a closure and recording every request it sees.
///
/// Each send yields once before answering so concurrent callers interleave on a
/// single-threaded runtime.
pub struct ScriptedTransport {
	responder: Box<Responder>,
	requests: Mutex<Vec<RecordedRequest>>,
}
impl ScriptedTransport {
	pub fn new<F>(responder: F) -> Arc<Self>
	where
		F: 'static + Fn(&RecordedRequest) -> Option<HttpResponse> + Send + Sync,
	{
		Arc::new(Self { responder: Box::new(responder), requests: Mutex::new(Vec::new()) })
	}

	/// Answers requests with `responses` in order.
	pub fn queued(responses: Vec<HttpResponse>) -> Arc<Self> {
		let queue = Mutex::new(VecDeque::from(responses));

		Self::new(move |_| queue.lock().pop_front())
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.requests.lock().clone()
	}

	pub fn count_path(&self, path: &str) -> usize {
		self.requests.lock().iter().filter(|request| request.path() == path).count()
	}
}
impl HttpTransport for ScriptedTransport {
	type TransportError = ScriptExhausted;

	fn send(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
		Box::pin(async move {
			tokio::task::yield_now().await;

			let (parts, body) = request.into_parts();
			let recorded = RecordedRequest {
				method: parts.method,
				url: parts.uri.to_string(),
				headers: parts.headers,
				body,
			};
			let response = (self.responder)(&recorded);

			self.requests.lock().push(recorded.clone());

			response.ok_or(ScriptExhausted(recorded.url))
		})
	}
}

/// Builds a JSON response with optional extra headers.
pub fn json_response(status: u16, headers: &[(&str, &str)], body: Value) -> HttpResponse {
	let mut builder = http::Response::builder()
		.status(StatusCode::from_u16(status).expect("Status fixture should be valid."));

	for (name, value) in headers {
		builder = builder.header(*name, *value);
	}

	builder
		.body(serde_json::to_vec(&body).expect("Body fixture should serialize."))
		.expect("Response fixture should build.")
}

/// Builds a response carrying raw bytes.
pub fn raw_response(status: u16, body: &str) -> HttpResponse {
	http::Response::builder()
		.status(StatusCode::from_u16(status).expect("Status fixture should be valid."))
		.body(body.as_bytes().to_vec())
		.expect("Response fixture should build.")
}
