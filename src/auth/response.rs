//! Token endpoint response model.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// JSON object returned by refresh and token endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenResponse {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token, if the server issued one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Token type, normally `DPoP`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_type: Option<String>,
	/// Access token lifetime in seconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_in: Option<i64>,
	/// Granted scope string.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	/// Subject the tokens were issued for.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
	/// Remaining provider-specific fields.
	#[serde(flatten)]
	pub extra: JsonMap<String, JsonValue>,
}
impl TokenResponse {
	/// Decodes a token response from an already-parsed JSON payload.
	pub fn from_payload(status: StatusCode, payload: JsonValue) -> Result<Self> {
		serde_path_to_error::deserialize(payload).map_err(|err| Error::parse(status, err))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn decoding_keeps_unknown_fields() {
		let payload = serde_json::json!({
			"access_token": "T2",
			"refresh_token": "R2",
			"token_type": "DPoP",
			"expires_in": 3600,
			"did": "did:plc:abc"
		});
		let response = TokenResponse::from_payload(StatusCode::OK, payload)
			.expect("Token response should decode.");

		assert_eq!(response.access_token.expose(), "T2");
		assert_eq!(response.refresh_token.as_ref().map(TokenSecret::expose), Some("R2"));
		assert_eq!(response.expires_in, Some(3600));
		assert_eq!(response.extra.get("did"), Some(&JsonValue::from("did:plc:abc")));
	}

	#[test]
	fn missing_access_token_reports_parse_error() {
		let err = TokenResponse::from_payload(StatusCode::OK, serde_json::json!({ "scope": "x" }))
			.expect_err("Missing access_token should fail.");

		assert!(matches!(err, Error::Parse { status: 200, .. }));
	}
}
