//! Retry and pacing knobs for one overwrite run.
//!
//! # Environment variables (all optional)
//! - `UPLOAD_MAX_ATTEMPTS`       - add attempts per record, first one unsimplified (default 2)
//! - `UPLOAD_SIMPLIFY_TOLERANCE` - generalization tolerance in native SR units (default 5)
//! - `UPLOAD_PAUSE_MS`           - pause after each attempted record (default 1000)

use std::time::Duration;

use arcgis_client::errors::{env_opt_f64, env_opt_u32, env_opt_u64};

use crate::errors::{Result, UploadError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 5.0;
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct UploadPolicy {
    /// Total add attempts per record. Attempt 1 sends the geometry as read;
    /// every later attempt sends a simplified copy of the original.
    pub max_attempts: u32,
    /// Tolerance of the first retry, in the geometry's own spatial
    /// reference units (degrees or metres, never converted).
    pub simplify_tolerance: f64,
    /// Pause after each record that reached the remote service.
    pub pause: Duration,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            simplify_tolerance: DEFAULT_SIMPLIFY_TOLERANCE,
            pause: DEFAULT_PAUSE,
        }
    }
}

impl UploadPolicy {
    /// Defaults overridden by `UPLOAD_*` variables.
    pub fn from_env() -> Result<Self> {
        let mut policy = Self::default();
        if let Some(v) = env_opt_u32("UPLOAD_MAX_ATTEMPTS")? {
            policy.max_attempts = v;
        }
        if let Some(v) = env_opt_f64("UPLOAD_SIMPLIFY_TOLERANCE")? {
            policy.simplify_tolerance = v;
        }
        if let Some(v) = env_opt_u64("UPLOAD_PAUSE_MS")? {
            policy.pause = Duration::from_millis(v);
        }
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(UploadError::Config("max_attempts must be >= 1".into()));
        }
        if !self.simplify_tolerance.is_finite() || self.simplify_tolerance < 0.0 {
            return Err(UploadError::Config(format!(
                "simplify_tolerance must be a finite value >= 0, got {}",
                self.simplify_tolerance
            )));
        }
        Ok(())
    }

    /// Tolerance used for `attempt` (1-based). Attempt 2 uses the base
    /// tolerance, attempt 3 twice that, and so on.
    pub fn tolerance_for_attempt(&self, attempt: u32) -> f64 {
        self.simplify_tolerance * f64::from(attempt.saturating_sub(1))
    }
}
