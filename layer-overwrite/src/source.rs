//! Local source tables.

use std::path::{Path, PathBuf};

use esri_geometry::{FeatureSet, Field};
use serde_json::Map;
use tracing::{debug, info};

use crate::{
    errors::{Result, SourceError},
    filter::RowFilter,
    ports::SourceTable,
    record::Row,
};

/// An Esri JSON feature set on disk, as written by `query` or `download --raw`.
///
/// Geometries without their own spatial reference inherit the document's.
/// Empty geometries (`{"x": null}`, no rings) read as null. A geometry that
/// does not decode fails the whole load; it is never treated as null.
#[derive(Debug, Clone)]
pub struct FeatureSetFile {
    path: PathBuf,
    set: FeatureSet,
}

impl FeatureSetFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let set = FeatureSet::read_from(&path).map_err(|e| SourceError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let source = Self::from_feature_set(path, set)?;
        info!(
            path = %source.path.display(),
            rows = source.set.features.len(),
            fields = source.set.fields.len(),
            "source table loaded"
        );
        Ok(source)
    }

    pub fn from_feature_set(path: impl Into<PathBuf>, set: FeatureSet) -> Result<Self> {
        if let Some(Err(_)) = set.geometry_kind() {
            return Err(SourceError::GeometryType(
                set.geometry_type.clone().unwrap_or_default(),
            )
            .into());
        }
        Ok(Self {
            path: path.into(),
            set,
        })
    }

    pub fn len(&self) -> usize {
        self.set.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.features.is_empty()
    }
}

impl SourceTable for FeatureSetFile {
    fn list_fields(&self) -> Vec<Field> {
        self.set.fields.clone()
    }

    fn rows<'a>(
        &'a self,
        fields: &'a [String],
        filter: &'a RowFilter,
    ) -> impl Iterator<Item = Row> + 'a {
        debug!(%filter, fields = fields.len(), "scanning source rows");
        self.set
            .features
            .iter()
            .filter(move |f| filter.matches(&f.attributes))
            .map(move |f| {
                let attributes: Map<_, _> = fields
                    .iter()
                    .filter_map(|name| f.attributes.get(name).map(|v| (name.clone(), v.clone())))
                    .collect();

                let geometry = f.geometry.as_ref().filter(|g| !g.is_empty()).map(|g| {
                    let mut g = g.clone();
                    if g.spatial_reference().is_none() {
                        g.set_spatial_reference(self.set.spatial_reference.clone());
                    }
                    g
                });

                Row {
                    geometry,
                    attributes,
                }
            })
    }
}
