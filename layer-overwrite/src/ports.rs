//! Seams between the upload loop and the outside world.
//!
//! The loop only sees these traits. `crate::adapters` binds them to the
//! ArcGIS REST client and the local geometry code; tests bind them to stubs.

use std::future::Future;

use esri_geometry::{EsriGeometry, Field};

use crate::{errors::Result, filter::RowFilter, record::{Record, Row}};

/// Looks up the destination layer by catalog (item) id.
pub trait LayerResolver {
    type Layer: RemoteLayer;

    /// Fails with [`crate::errors::UploadError::NotFound`] when the id does
    /// not name an existing layer.
    fn resolve_layer(&self, catalog_id: &str) -> impl Future<Output = Result<Self::Layer>> + Send;
}

/// Destination layer of one run.
pub trait RemoteLayer {
    /// Human-readable name for logs and errors.
    fn describe(&self) -> String;

    /// Removes every row. `Ok(false)` means the service refused.
    fn truncate(&self) -> impl Future<Output = Result<bool>> + Send;

    /// Sends one record. A rejected record is an `Ok` value; `Err` is kept
    /// for failures of the call itself.
    fn add_feature(&self, record: &Record) -> impl Future<Output = Result<AddResult>> + Send;
}

pub trait GeometrySimplifier {
    fn simplify(&self, geometry: &EsriGeometry, tolerance: f64) -> Result<EsriGeometry>;
}

/// Local table the records come from.
pub trait SourceTable {
    fn list_fields(&self) -> Vec<Field>;

    /// Rows matching `filter`, in source order, carrying only `fields`.
    /// Every call starts a fresh scan.
    fn rows<'a>(
        &'a self,
        fields: &'a [String],
        filter: &'a RowFilter,
    ) -> impl Iterator<Item = Row> + 'a;
}

/// Outcome of one add call as reported by the service.
///
/// `add_results: None` (no list at all) is distinct from an empty list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddResult {
    pub add_results: Option<Vec<AddResultEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddResultEntry {
    pub success: Option<bool>,
    pub error: Option<String>,
}

impl AddResult {
    pub fn accepted() -> Self {
        Self {
            add_results: Some(vec![AddResultEntry {
                success: Some(true),
                error: None,
            }]),
        }
    }

    pub fn rejected(detail: impl Into<String>) -> Self {
        Self {
            add_results: Some(vec![AddResultEntry {
                success: Some(false),
                error: Some(detail.into()),
            }]),
        }
    }

    /// `Ok(())` iff there is exactly one entry and it reports success;
    /// otherwise the failure detail.
    pub fn classify(&self) -> std::result::Result<(), String> {
        let Some(entries) = &self.add_results else {
            return Err(UNKNOWN_ERROR.into());
        };
        match entries.as_slice() {
            [] => Err("No result".into()),
            [entry] if entry.success == Some(true) => Ok(()),
            [entry] => Err(entry.error.clone().unwrap_or_else(|| UNKNOWN_ERROR.into())),
            many => Err(format!("expected 1 add result, got {}", many.len())),
        }
    }
}

pub const UNKNOWN_ERROR: &str = "Unknown error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_success_and_failure_details() {
        assert_eq!(AddResult::accepted().classify(), Ok(()));
        assert_eq!(
            AddResult::rejected("1000: Invalid ring").classify(),
            Err("1000: Invalid ring".to_string())
        );
        assert_eq!(
            AddResult { add_results: Some(vec![]) }.classify(),
            Err("No result".to_string())
        );
        assert_eq!(
            AddResult { add_results: None }.classify(),
            Err("Unknown error".to_string())
        );
    }

    #[test]
    fn classify_missing_flag_or_detail() {
        let no_flag = AddResult {
            add_results: Some(vec![AddResultEntry::default()]),
        };
        assert_eq!(no_flag.classify(), Err("Unknown error".to_string()));

        let two = AddResult {
            add_results: Some(vec![
                AddResultEntry { success: Some(true), error: None },
                AddResultEntry { success: Some(true), error: None },
            ]),
        };
        assert_eq!(two.classify(), Err("expected 1 add result, got 2".to_string()));
    }
}
