//! Esri JSON geometry model and the conversions around it.
//!
//! - [`model`]       - `Point` / `Multipoint` / `Polyline` / `Polygon` as the REST API ships them
//! - [`feature_set`] - `FeatureSet` documents returned by `query` and accepted by `addFeatures`
//! - [`simplify`]    - Douglas–Peucker generalization in native spatial reference units
//! - [`convert`]     - conversion into `geo` types and WKT
//! - [`table`]       - in-memory geospatial table built from a feature set

pub mod convert;
pub mod errors;
pub mod feature_set;
pub mod model;
pub mod simplify;
pub mod table;

pub use convert::{to_geo, to_wkt};
pub use errors::{GeometryError, Result};
pub use feature_set::{Feature, FeatureSet, Field};
pub use model::{
    EsriGeometry, GeometryKind, MultipointShape, PointShape, PolygonShape, PolylineShape,
    Position, SpatialReference,
};
pub use simplify::simplify;
pub use table::{GeoRow, GeoTable};
