//! Signed-in HTTP session against one portal.
//!
//! Every request carries `f=json` and the session token. Bodies are decoded
//! in two steps: the ArcGIS error envelope first (it arrives with HTTP 200),
//! then the expected payload.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::{
    auth,
    config::AgolConfig,
    errors::{ArcGisError, Result},
    types::ErrorEnvelope,
};

/// Authenticated ArcGIS REST session.
///
/// Construct once per run with [`ArcGisClient::sign_in`] and pass by
/// reference to everything that talks to the portal or its services.
#[derive(Debug, Clone)]
pub struct ArcGisClient {
    http: Client,
    cfg: AgolConfig,
    token: String,
}

impl ArcGisClient {
    /// Builds the HTTP client and acquires a token for the configured user.
    #[instrument(skip_all, fields(portal = %cfg.portal_url, user = %cfg.username))]
    pub async fn sign_in(cfg: AgolConfig) -> Result<Self> {
        cfg.validate()?;

        let http = Client::builder()
            .user_agent("agol-tools/0.1")
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .danger_accept_invalid_certs(!cfg.verify_cert)
            .build()?;

        let token = auth::generate_token(&http, &cfg).await?;
        info!("signed in");

        Ok(Self {
            http,
            cfg,
            token: token.token,
        })
    }

    pub fn config(&self) -> &AgolConfig {
        &self.cfg
    }

    /// GET with query parameters; `f=json` and `token` are appended.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        debug!("GET {}", url);
        let body = self
            .http
            .get(url)
            .query(params)
            .query(&[("f", "json"), ("token", self.token.as_str())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        decode_response(&body)
    }

    /// Form POST; `f=json` and `token` are appended.
    pub(crate) async fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        debug!("POST {}", url);
        let mut form: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        form.push(("f", "json"));
        form.push(("token", self.token.as_str()));

        let body = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        decode_response(&body)
    }
}

/// Decodes a response body, surfacing the ArcGIS error envelope as
/// [`ArcGisError::Api`].
pub fn decode_response<T: DeserializeOwned>(body: &str) -> Result<T> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ArcGisError::InvalidResponse(format!("{e}; body: {}", snippet(body))))?;

    if value.get("error").is_some() {
        let env: ErrorEnvelope = serde_json::from_value(value)?;
        return Err(ArcGisError::Api {
            code: env.error.code,
            message: env.error.message,
            details: env.error.details,
        });
    }

    Ok(serde_json::from_value(value)?)
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
