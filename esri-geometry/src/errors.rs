//! Error type for geometry decoding, conversion and simplification.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeometryError>;

#[derive(Debug, Error)]
pub enum GeometryError {
    /// Simplification tolerance was negative, NaN or infinite.
    #[error("invalid simplification tolerance: {0}")]
    InvalidTolerance(f64),

    /// A coordinate array had fewer than two numbers.
    #[error("invalid position: expected at least [x, y], got {0} values")]
    InvalidPosition(usize),

    /// x or y was `null` inside a shape.
    #[error("invalid position: x and y must be finite numbers")]
    NonFiniteCoordinate,

    /// Unknown `geometryType` string.
    #[error("unsupported geometry type: {0}")]
    UnsupportedType(String),

    /// One feature of a feature set document did not decode.
    #[error("feature {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },

    /// JSON did not match any Esri geometry shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// I/O while writing table exports.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
