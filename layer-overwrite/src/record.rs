//! Rows, records and per-record outcomes.

use esri_geometry::{EsriGeometry, Feature, Field};
use serde_json::{Map, Value};

/// Placeholder for a record whose unique id field is absent or null.
pub const MISSING_ID: &str = "<missing>";

/// One source row restricted to the selected fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub geometry: Option<EsriGeometry>,
    pub attributes: Map<String, Value>,
}

/// A row that will be sent to the remote layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub geometry: EsriGeometry,
    pub attributes: Map<String, Value>,
    /// Reporting only; never sent separately.
    pub unique_id: String,
}

impl Record {
    /// `None` for rows without geometry; those are skipped, not uploaded.
    pub fn from_row(row: Row, unique_id_field: &str) -> Option<Self> {
        let geometry = row.geometry?;
        let unique_id = render_unique_id(&row.attributes, unique_id_field);
        Some(Self {
            geometry,
            attributes: row.attributes,
            unique_id,
        })
    }

    /// Same attributes and id, different geometry.
    pub fn with_geometry(&self, geometry: EsriGeometry) -> Self {
        Self {
            geometry,
            attributes: self.attributes.clone(),
            unique_id: self.unique_id.clone(),
        }
    }

    /// Wire form for `addFeatures`.
    pub fn to_feature(&self) -> Feature {
        Feature {
            attributes: self.attributes.clone(),
            geometry: Some(self.geometry.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Succeeded,
    SucceededAfterSimplification,
    Failed { last_error: String },
}

/// Strings render without quotes, other scalars as JSON text.
pub fn render_unique_id(attributes: &Map<String, Value>, field: &str) -> String {
    match attributes.get(field) {
        None | Some(Value::Null) => MISSING_ID.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Every field except geometry and object id, in source order.
pub fn select_fields(fields: &[Field]) -> Vec<String> {
    fields
        .iter()
        .filter(|f| !f.is_geometry() && !f.is_object_id())
        .map(|f| f.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use esri_geometry::{
        PointShape,
        feature_set::{FIELD_TYPE_GEOMETRY, FIELD_TYPE_OID},
    };
    use serde_json::json;

    fn point() -> EsriGeometry {
        EsriGeometry::Point(PointShape {
            x: Some(1.0),
            y: Some(2.0),
            z: None,
            m: None,
            spatial_reference: None,
        })
    }

    #[test]
    fn select_fields_drops_geometry_and_oid() {
        let fields = vec![
            Field::new("OBJECTID", FIELD_TYPE_OID),
            Field::new("PARCEL_ID", "esriFieldTypeString"),
            Field::new("SHAPE", FIELD_TYPE_GEOMETRY),
            Field::new("AREA_HA", "esriFieldTypeDouble"),
        ];
        assert_eq!(select_fields(&fields), vec!["PARCEL_ID", "AREA_HA"]);
    }

    #[test]
    fn unique_id_renders_as_text() {
        let attrs = json!({ "S": "P-17", "N": 42, "Z": null })
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(render_unique_id(&attrs, "S"), "P-17");
        assert_eq!(render_unique_id(&attrs, "N"), "42");
        assert_eq!(render_unique_id(&attrs, "Z"), MISSING_ID);
        assert_eq!(render_unique_id(&attrs, "NOPE"), MISSING_ID);
    }

    #[test]
    fn rows_without_geometry_do_not_become_records() {
        let attrs = json!({ "ID": "A" }).as_object().cloned().unwrap();
        let empty = Row {
            geometry: None,
            attributes: attrs.clone(),
        };
        assert!(Record::from_row(empty, "ID").is_none());

        let rec = Record::from_row(
            Row {
                geometry: Some(point()),
                attributes: attrs,
            },
            "ID",
        )
        .unwrap();
        assert_eq!(rec.unique_id, "A");
        let feature = rec.to_feature();
        assert_eq!(feature.attributes, rec.attributes);
        assert_eq!(feature.geometry, Some(point()));
    }
}
