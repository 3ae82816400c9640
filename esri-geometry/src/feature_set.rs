//! Feature set documents: what `query` returns and what `addFeatures` takes.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    errors::{GeometryError, Result},
    model::{EsriGeometry, GeometryKind, SpatialReference},
};

pub const FIELD_TYPE_OID: &str = "esriFieldTypeOID";
pub const FIELD_TYPE_GEOMETRY: &str = "esriFieldTypeGeometry";

/// Field description as listed in a feature set or layer definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            alias: None,
            length: None,
        }
    }

    pub fn is_object_id(&self) -> bool {
        self.field_type == FIELD_TYPE_OID
    }

    pub fn is_geometry(&self) -> bool {
        self.field_type == FIELD_TYPE_GEOMETRY
    }
}

/// One feature: attribute map plus optional geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<EsriGeometry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id_field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub features: Vec<Feature>,
    /// Set by the server when more rows are available past this page.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exceeded_transfer_limit: bool,
}

impl FeatureSet {
    /// Reads a feature set JSON document from disk.
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Decodes a feature set document. A feature that does not decode is
    /// reported with its index.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        if let Some(features) = value.get("features").and_then(Value::as_array) {
            for (index, feature) in features.iter().enumerate() {
                if let Err(e) = Feature::deserialize(feature) {
                    return Err(GeometryError::InvalidFeature {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Writes the feature set as pretty JSON.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), raw)?;
        Ok(())
    }

    pub fn geometry_kind(&self) -> Option<Result<GeometryKind>> {
        self.geometry_type.as_deref().map(str::parse)
    }

    /// Appends the features of a following page, keeping this page's schema.
    pub fn extend_page(&mut self, next: FeatureSet) {
        self.features.extend(next.features);
        self.exceeded_transfer_limit = next.exceeded_transfer_limit;
    }
}
