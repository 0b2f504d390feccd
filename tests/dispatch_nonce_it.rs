mod common;

// crates.io
use dpop_client::{
	dispatch::DpopDispatcher,
	dpop::{CompactJws, Es256Key, ProofClaims},
	error::Error,
	http_types::{HeaderMap, Method},
	url::Url,
};
use serde_json::json;
// self
use common::{ScriptedTransport, json_response};

fn proof_nonce(request: &common::RecordedRequest) -> Option<String> {
	let proof = request.header("dpop").expect("Every request should carry a DPoP proof.");

	CompactJws::parse(proof)
		.and_then(|jws| jws.claims::<ProofClaims>())
		.expect("Proof claims should decode.")
		.nonce
}

fn target() -> Url {
	Url::parse("https://api.example.com/endpoint").expect("Target fixture should parse.")
}

#[tokio::test]
async fn nonce_rejection_is_retried_once_with_the_new_nonce() {
	let transport = ScriptedTransport::queued(vec![
		json_response(400, &[("DPoP-Nonce", "n-1")], json!({ "error": "use_dpop_nonce" })),
		json_response(200, &[("DPoP-Nonce", "n-2")], json!({ "result": "ok" })),
	]);
	let dispatcher: DpopDispatcher<ScriptedTransport> =
		DpopDispatcher::new(Es256Key::generate(), transport.clone());
	let payload = dispatcher
		.dispatch(&target(), &Method::GET, HeaderMap::new(), None)
		.await
		.expect("Dispatch should succeed after one nonce retry.");
	let requests = transport.requests();

	assert_eq!(payload.body, json!({ "result": "ok" }));
	assert_eq!(requests.len(), 2);
	assert_eq!(proof_nonce(&requests[0]), None);
	assert_eq!(proof_nonce(&requests[1]).as_deref(), Some("n-1"));
	assert_ne!(requests[0].header("dpop"), requests[1].header("dpop"));
	assert_eq!(dispatcher.nonces().current().as_deref(), Some("n-2"));
}

#[tokio::test]
async fn second_nonce_rejection_becomes_an_api_error() {
	let transport = ScriptedTransport::queued(vec![
		json_response(400, &[("DPoP-Nonce", "n-1")], json!({ "error": "use_dpop_nonce" })),
		json_response(400, &[("DPoP-Nonce", "n-2")], json!({ "error": "use_dpop_nonce" })),
		json_response(200, &[], json!({ "result": "unreachable" })),
	]);
	let dispatcher: DpopDispatcher<ScriptedTransport> =
		DpopDispatcher::new(Es256Key::generate(), transport.clone());
	let err = dispatcher
		.dispatch(&target(), &Method::POST, HeaderMap::new(), None)
		.await
		.expect_err("A second nonce rejection should not be retried.");

	assert!(matches!(err, Error::Api { status: 400, ref body } if body.contains("use_dpop_nonce")));
	assert_eq!(transport.requests().len(), 2);
	assert_eq!(dispatcher.nonces().current().as_deref(), Some("n-2"));
}

#[tokio::test]
async fn other_failures_are_not_retried() {
	let transport = ScriptedTransport::queued(vec![
		json_response(500, &[], json!({ "error": "InternalServerError" })),
		json_response(200, &[], json!({})),
	]);
	let dispatcher: DpopDispatcher<ScriptedTransport> =
		DpopDispatcher::new(Es256Key::generate(), transport.clone());
	let err = dispatcher
		.dispatch(&target(), &Method::GET, HeaderMap::new(), None)
		.await
		.expect_err("A server error should surface directly.");

	assert_eq!(err.status(), Some(500));
	assert!(err.to_string().starts_with("Request failed: 500 - "));
	assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn successful_responses_refresh_the_tracked_nonce() {
	let transport = ScriptedTransport::queued(vec![
		json_response(200, &[("DPoP-Nonce", "n-1")], json!({})),
		json_response(200, &[], json!({})),
	]);
	let dispatcher: DpopDispatcher<ScriptedTransport> =
		DpopDispatcher::new(Es256Key::generate(), transport.clone());

	dispatcher
		.dispatch(&target(), &Method::GET, HeaderMap::new(), None)
		.await
		.expect("First dispatch should succeed.");
	dispatcher
		.dispatch(&target(), &Method::GET, HeaderMap::new(), None)
		.await
		.expect("Second dispatch should succeed.");

	let requests = transport.requests();

	assert_eq!(proof_nonce(&requests[1]).as_deref(), Some("n-1"));
	assert_eq!(dispatcher.nonces().current().as_deref(), Some("n-1"));
}
