//! Unified error handling for `arcgis-client`.
//!
//! A single top-level error [`ArcGisError`] covers transport, HTTP status,
//! ArcGIS error envelopes and configuration. Env helpers used by the config
//! loaders live here too and return the unified [`Result<T>`].

use thiserror::Error;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

pub type Result<T> = std::result::Result<T, ArcGisError>;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ArcGisError {
    /// Configuration problems (missing credentials, bad URLs, numbers).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Item, folder or layer lookup found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Error envelope returned inside a 200 response (`{"error": {...}}`).
    #[error("arcgis error {code}: {message}")]
    Api {
        code: i64,
        message: String,
        details: Vec<String>,
    },

    /// Unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited,

    /// Gateway / server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other non-2xx status.
    #[error("http status error: status {0}")]
    HttpStatus(u16),

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without HTTP status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// Response body was not the expected JSON shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (timeouts, limits, tolerances).
    #[error("invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    /// Value had the wrong format (URL without scheme, bad boolean).
    #[error("invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },
}

/* ------------------------------------------------------------------------- */
/* Conversions                                                               */
/* ------------------------------------------------------------------------- */

impl From<reqwest::Error> for ArcGisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ArcGisError::Timeout;
        }

        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => ArcGisError::Unauthorized,
                403 => ArcGisError::Forbidden,
                404 => ArcGisError::NotFound(e.url().map(|u| u.to_string()).unwrap_or_default()),
                429 => ArcGisError::RateLimited,
                500..=599 => ArcGisError::Server(code),
                _ => ArcGisError::HttpStatus(code),
            };
        }

        if e.is_decode() {
            return ArcGisError::InvalidResponse(e.to_string());
        }

        ArcGisError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for ArcGisError {
    fn from(e: serde_json::Error) -> Self {
        ArcGisError::InvalidResponse(e.to_string())
    }
}

/* ------------------------------------------------------------------------- */
/* Env helpers                                                               */
/* ------------------------------------------------------------------------- */

/// Fetches a required, non-empty environment variable.
pub fn must_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingVar(name).into()),
    }
}

/// Optional string (`None` if unset/empty).
pub fn env_opt(name: &'static str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses an optional `u32` from env (`Ok(None)` if unset/empty).
pub fn env_opt_u32(name: &'static str) -> Result<Option<u32>> {
    match env_opt(name) {
        None => Ok(None),
        Some(v) => v.parse::<u32>().map(Some).map_err(|_| {
            ConfigError::InvalidNumber {
                var: name,
                reason: "expected u32",
            }
            .into()
        }),
    }
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    match env_opt(name) {
        None => Ok(None),
        Some(v) => v.parse::<u64>().map(Some).map_err(|_| {
            ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            }
            .into()
        }),
    }
}

/// Parses an optional `f64` from env (`Ok(None)` if unset/empty).
pub fn env_opt_f64(name: &'static str) -> Result<Option<f64>> {
    match env_opt(name) {
        None => Ok(None),
        Some(v) => v.parse::<f64>().map(Some).map_err(|_| {
            ConfigError::InvalidNumber {
                var: name,
                reason: "expected a decimal number",
            }
            .into()
        }),
    }
}

/// Parses an optional boolean (`true/false/1/0/yes/no`, case-insensitive).
pub fn env_opt_bool(name: &'static str) -> Result<Option<bool>> {
    match env_opt(name) {
        None => Ok(None),
        Some(v) => parse_bool(&v).map(Some).ok_or_else(|| {
            ConfigError::InvalidFormat {
                var: name,
                reason: "expected true/false",
            }
            .into()
        }),
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
