//! Error hierarchy for the overwrite run.
//!
//! Only fatal conditions are errors. Per-record add failures are values
//! ([`crate::record::UploadOutcome`]) and end up in the run report.

use arcgis_client::ArcGisError;
use esri_geometry::GeometryError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, UploadError>;

#[derive(Debug, Error)]
pub enum UploadError {
    /// Layer id does not resolve to an existing layer.
    #[error("feature layer not found: {0}")]
    NotFound(String),

    /// Truncate did not report success; nothing was uploaded.
    #[error("truncate failed for {layer}: {reason}")]
    Truncate { layer: String, reason: String },

    /// Remote call failure outside the per-record loop.
    #[error(transparent)]
    Remote(#[from] ArcGisError),

    /// Local source table could not be read.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Row filter expression is invalid.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Geometry simplification failed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Invalid run parameters (policy values, unique id field).
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read source table {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("unsupported source geometry type: {0}")]
    GeometryType(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("unexpected end of filter expression")]
    UnexpectedEnd,

    #[error("unexpected token '{token}' at position {pos}")]
    UnexpectedToken { token: String, pos: usize },

    #[error("unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}
