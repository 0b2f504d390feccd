//! Calls an authenticated endpoint with a DPoP-bound session.
//!
//! Reads the session from the environment:
//!
//! - `DPOP_BASE_URL` (optional, defaults to `https://bsky.social`)
//! - `DPOP_ACCESS_TOKEN` and `DPOP_REFRESH_TOKEN`
//! - `DPOP_KEY_JWK`, the private P-256 JWK the tokens are bound to
//!
//! An expired access token is refreshed once and the call replayed; the rotated tokens are
//! printed so they can be persisted.

// std
use std::env;
// crates.io
use color_eyre::{Result, eyre::eyre};
// self
use dpop_client::{
	auth::TokenPair,
	config::ClientConfig,
	dpop::Es256Key,
	session::{ApiRequest, ReqwestSession},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = match env::var("DPOP_BASE_URL") {
		Ok(base_url) => ClientConfig::parse(&base_url)?,
		Err(_) => ClientConfig::default(),
	};
	let key = Es256Key::from_jwk_json(&env::var("DPOP_KEY_JWK")?)?;
	let tokens = TokenPair::new(env::var("DPOP_ACCESS_TOKEN")?)
		.with_refresh_token(env::var("DPOP_REFRESH_TOKEN")?);
	let url = config.base_url.join("/xrpc/com.atproto.server.getSession")?;
	let session = ReqwestSession::new(config, key, tokens);
	let body = session.request(ApiRequest::get(url)).await?;

	println!("session: {body:#}");

	let metrics = session.refresh_metrics();

	if metrics.successes() > 0 {
		let tokens = session.tokens();
		let access = tokens.access_token.ok_or_else(|| eyre!("Refresh left no access token."))?;

		println!("rotated access token: {}", access.expose());

		if let Some(refresh) = tokens.refresh_token {
			println!("rotated refresh token: {}", refresh.expose());
		}
	}

	Ok(())
}
