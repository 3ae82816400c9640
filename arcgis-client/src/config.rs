//! Connection settings loaded strictly from environment variables.
//!
//! # Environment variables
//!
//! Required:
//! - `AGOL_PORTAL_URL` - portal root, e.g. `https://myorg.maps.arcgis.com`
//! - `AGOL_USERNAME`, `AGOL_PASSWORD` - named user credentials
//!
//! Optional:
//! - `AGOL_TOKEN_URL`     - defaults to `{portal}/sharing/rest/generateToken`
//! - `AGOL_REFERER`       - referer bound to the token, defaults to the portal URL
//! - `AGOL_ACCOUNT_ID`    - org id used in hosted service URLs (download by name)
//! - `AGOL_SERVICES_URL`  - hosted services host, defaults to `https://services6.arcgis.com`
//! - `AGOL_TOKEN_MINUTES` - requested token lifetime (default 60)
//! - `AGOL_TIMEOUT_SECS`  - per-request timeout (default 60)
//! - `AGOL_VERIFY_CERT`   - `false` accepts invalid TLS certificates (default `true`)

use std::fmt;

use crate::errors::{
    ConfigError, Result, env_opt, env_opt_bool, env_opt_u32, env_opt_u64, must_env,
};

pub const DEFAULT_SERVICES_URL: &str = "https://services6.arcgis.com";
pub const DEFAULT_TOKEN_MINUTES: u32 = 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct AgolConfig {
    pub portal_url: String,
    pub token_url: String,
    pub referer: String,
    pub username: String,
    pub password: String,
    pub account_id: Option<String>,
    pub services_url: String,
    pub token_minutes: u32,
    pub timeout_secs: u64,
    pub verify_cert: bool,
}

// Keep the password out of logs.
impl fmt::Debug for AgolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgolConfig")
            .field("portal_url", &self.portal_url)
            .field("token_url", &self.token_url)
            .field("referer", &self.referer)
            .field("username", &self.username)
            .field("account_id", &self.account_id)
            .field("services_url", &self.services_url)
            .field("token_minutes", &self.token_minutes)
            .field("timeout_secs", &self.timeout_secs)
            .field("verify_cert", &self.verify_cert)
            .finish_non_exhaustive()
    }
}

impl AgolConfig {
    /// Config with defaults for everything but the portal and credentials.
    pub fn new(
        portal_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let portal_url = portal_url.into().trim_end_matches('/').to_string();
        Self {
            token_url: format!("{portal_url}/sharing/rest/generateToken"),
            referer: portal_url.clone(),
            portal_url,
            username: username.into(),
            password: password.into(),
            account_id: None,
            services_url: DEFAULT_SERVICES_URL.to_string(),
            token_minutes: DEFAULT_TOKEN_MINUTES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            verify_cert: true,
        }
    }

    /// Loads and validates the config from the process environment.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::new(
            must_env("AGOL_PORTAL_URL")?,
            must_env("AGOL_USERNAME")?,
            must_env("AGOL_PASSWORD")?,
        );

        if let Some(v) = env_opt("AGOL_TOKEN_URL") {
            cfg.token_url = v;
        }
        if let Some(v) = env_opt("AGOL_REFERER") {
            cfg.referer = v;
        }
        cfg.account_id = env_opt("AGOL_ACCOUNT_ID");
        if let Some(v) = env_opt("AGOL_SERVICES_URL") {
            cfg.services_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = env_opt_u32("AGOL_TOKEN_MINUTES")? {
            cfg.token_minutes = v;
        }
        if let Some(v) = env_opt_u64("AGOL_TIMEOUT_SECS")? {
            cfg.timeout_secs = v;
        }
        if let Some(v) = env_opt_bool("AGOL_VERIFY_CERT")? {
            cfg.verify_cert = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        check_url("AGOL_PORTAL_URL", &self.portal_url)?;
        check_url("AGOL_TOKEN_URL", &self.token_url)?;
        check_url("AGOL_SERVICES_URL", &self.services_url)?;
        if self.token_minutes == 0 {
            return Err(ConfigError::InvalidNumber {
                var: "AGOL_TOKEN_MINUTES",
                reason: "must be > 0",
            }
            .into());
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                var: "AGOL_TIMEOUT_SECS",
                reason: "must be > 0",
            }
            .into());
        }
        Ok(())
    }

    /// `{portal}/sharing/rest`
    pub fn sharing_url(&self) -> String {
        format!("{}/sharing/rest", self.portal_url)
    }

    /// URL of a hosted feature layer by service name, e.g.
    /// `https://services6.arcgis.com/{account}/arcgis/rest/services/{name}/FeatureServer/0`.
    pub fn hosted_layer_url(&self, service_name: &str, layer_index: u32) -> Result<String> {
        let account = self
            .account_id
            .as_deref()
            .ok_or(ConfigError::MissingVar("AGOL_ACCOUNT_ID"))?;
        Ok(format!(
            "{}/{}/arcgis/rest/services/{}/FeatureServer/{}",
            self.services_url,
            account,
            urlencoding::encode(service_name),
            layer_index
        ))
    }
}

fn check_url(var: &'static str, url: &str) -> Result<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ArcGisError;

    #[test]
    fn defaults_derive_from_portal() {
        let cfg = AgolConfig::new("https://example.maps.arcgis.com/", "me", "secret");
        assert_eq!(cfg.portal_url, "https://example.maps.arcgis.com");
        assert_eq!(
            cfg.token_url,
            "https://example.maps.arcgis.com/sharing/rest/generateToken"
        );
        assert_eq!(cfg.referer, cfg.portal_url);
        assert!(cfg.verify_cert);
        cfg.validate().unwrap();
    }

    #[test]
    fn debug_hides_password() {
        let cfg = AgolConfig::new("https://example.maps.arcgis.com", "me", "hunter2");
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }

    #[test]
    fn rejects_url_without_scheme() {
        let cfg = AgolConfig::new("example.maps.arcgis.com", "me", "secret");
        assert!(matches!(
            cfg.validate(),
            Err(ArcGisError::Config(ConfigError::InvalidFormat { .. }))
        ));
    }

    #[test]
    fn hosted_layer_url_needs_account() {
        let mut cfg = AgolConfig::new("https://example.maps.arcgis.com", "me", "secret");
        assert!(cfg.hosted_layer_url("Roads", 0).is_err());

        cfg.account_id = Some("AbC123".into());
        assert_eq!(
            cfg.hosted_layer_url("Roads", 0).unwrap(),
            "https://services6.arcgis.com/AbC123/arcgis/rest/services/Roads/FeatureServer/0"
        );
    }
}
