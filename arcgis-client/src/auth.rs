//! Token acquisition via `generateToken`.

use reqwest::Client;
use tracing::{debug, instrument};

use crate::{
    client::decode_response,
    config::AgolConfig,
    errors::{ArcGisError, Result},
    types::TokenResponse,
};

/// Requests a token for the configured named user.
///
/// The token is bound to `cfg.referer`; every later request sends it as the
/// `token` parameter.
#[instrument(skip_all, fields(url = %cfg.token_url))]
pub async fn generate_token(http: &Client, cfg: &AgolConfig) -> Result<TokenResponse> {
    let expiration = cfg.token_minutes.to_string();
    let form = [
        ("username", cfg.username.as_str()),
        ("password", cfg.password.as_str()),
        ("client", "referer"),
        ("referer", cfg.referer.as_str()),
        ("expiration", expiration.as_str()),
        ("f", "json"),
    ];

    let body = http
        .post(&cfg.token_url)
        .form(&form)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let token = parse_token(&body)?;
    debug!(expires = ?token.expires, "token acquired");
    Ok(token)
}

fn parse_token(body: &str) -> Result<TokenResponse> {
    let token: TokenResponse = decode_response(body)?;
    if token.token.trim().is_empty() {
        return Err(ArcGisError::InvalidResponse("empty token".into()));
    }
    Ok(token)
}
