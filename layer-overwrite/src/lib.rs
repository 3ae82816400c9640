//! Overwrite a hosted feature layer from a local source table.
//!
//! The remote layer is truncated once, then records are added one at a
//! time. A record the service rejects is retried with a simplified copy of
//! its original geometry; records that fail every attempt are collected in
//! the [`UploadReport`] and the run goes on.
//!
//! - [`ports`]    - traits the loop talks to (resolver, layer, simplifier, source)
//! - [`uploader`] - the loop itself
//! - [`adapters`] - ports bound to `arcgis-client` and `esri-geometry`
//! - [`source`]   - Esri JSON feature set files as source tables
//! - [`filter`]   - local where-clause evaluation

pub mod adapters;
pub mod errors;
pub mod filter;
pub mod policy;
pub mod ports;
pub mod record;
pub mod report;
pub mod source;
pub mod uploader;

pub use adapters::{ArcGisLayerResolver, ArcGisRemoteLayer, DouglasPeucker};
pub use errors::{FilterError, Result, SourceError, UploadError};
pub use filter::RowFilter;
pub use policy::UploadPolicy;
pub use ports::{AddResult, AddResultEntry, GeometrySimplifier, LayerResolver, RemoteLayer, SourceTable};
pub use record::{Record, Row, UploadOutcome};
pub use report::UploadReport;
pub use source::FeatureSetFile;
pub use uploader::{LayerOverwriteUploader, OverwriteRequest};
