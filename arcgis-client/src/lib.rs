//! Async client for the ArcGIS REST API (ArcGIS Online / Enterprise portals).
//!
//! Covers what the agol tools need and nothing more:
//!   * token generation for a named user ([`auth`])
//!   * portal content: items, folders, item copies ([`portal`])
//!   * feature layer query / truncate / addFeatures ([`feature_layer`])
//!
//! All calls go through one [`ArcGisClient`] created by
//! [`ArcGisClient::sign_in`]. Errors are unified in [`ArcGisError`].

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod feature_layer;
pub mod portal;
pub mod types;

pub use client::ArcGisClient;
pub use config::AgolConfig;
pub use errors::{ArcGisError, ConfigError, Result};
pub use feature_layer::{FeatureLayer, QueryParams};
pub use portal::find_folder;
pub use types::{AddFeaturesResponse, EditError, EditResult, Folder, ItemInfo};
