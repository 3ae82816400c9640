//! In-memory geospatial table: attribute rows with a `geo` geometry column.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use geo::Geometry;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{
    convert::{to_geo, to_wkt},
    errors::Result,
    feature_set::{FeatureSet, Field},
};

#[derive(Debug, Clone, PartialEq)]
pub struct GeoRow {
    pub attributes: Map<String, Value>,
    pub geometry: Option<Geometry<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoTable {
    pub fields: Vec<Field>,
    /// Spatial reference of every geometry in the table.
    pub wkid: Option<u32>,
    pub rows: Vec<GeoRow>,
}

impl GeoTable {
    /// Builds a table from a queried feature set.
    ///
    /// Features whose geometry is absent or empty get `geometry: None`.
    pub fn from_feature_set(fs: &FeatureSet) -> Result<Self> {
        let mut rows = Vec::with_capacity(fs.features.len());
        for feature in &fs.features {
            let geometry = match &feature.geometry {
                Some(g) => to_geo(g)?,
                None => None,
            };
            rows.push(GeoRow {
                attributes: feature.attributes.clone(),
                geometry,
            });
        }

        let wkid = fs
            .spatial_reference
            .as_ref()
            .and_then(|sr| sr.effective_wkid());

        let missing = rows.iter().filter(|r| r.geometry.is_none()).count();
        if missing > 0 {
            warn!(missing, "rows without geometry");
        }

        Ok(Self {
            fields: fs.fields.clone(),
            wkid,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes one JSON object per row: all attributes plus a `wkt` column
    /// (`null` when the row has no geometry).
    pub fn write_jsonl(&self, path: &Path) -> Result<()> {
        let f = File::create(path)?;
        let mut w = BufWriter::new(f);

        for row in &self.rows {
            let mut obj = row.attributes.clone();
            let wkt = row.geometry.as_ref().map(to_wkt);
            obj.insert("wkt".to_string(), wkt.map_or(Value::Null, Value::String));
            serde_json::to_writer(&mut w, &obj)?;
            w.write_all(b"\n")?;
        }

        w.flush()?;
        info!(rows = self.rows.len(), "jsonl: wrote table -> {}", path.display());
        Ok(())
    }
}
