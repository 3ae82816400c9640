//! Esri JSON geometry objects.
//!
//! Shapes are distinguished by their members (`rings`, `paths`, `points`,
//! `x`/`y`), not by a type tag, so [`EsriGeometry`] is an untagged enum.
//! Positions are kept as raw number arrays (`[x, y, z?, m?]`) so z/m values
//! survive a decode → simplify → encode cycle untouched.
//!
//! Decoding is strict: every shape rejects members it does not know, so a
//! curve geometry or a malformed polygon is an error instead of an empty
//! point. A `null` ordinate (Esri's encoding of a NaN m or z) reads as
//! `f64::NAN` and is written back as `null`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{GeometryError, Result};

/// `[x, y]`, `[x, y, z]`, `[x, y, m]` or `[x, y, z, m]`.
pub type Position = Vec<f64>;

/// Ordinate arrays that may contain `null`.
mod nullable {
    use serde::{Deserialize, Deserializer};

    use super::Position;

    fn position(raw: Vec<Option<f64>>) -> Position {
        raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
    }

    pub fn positions<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Position>, D::Error> {
        let raw = Vec::<Vec<Option<f64>>>::deserialize(d)?;
        Ok(raw.into_iter().map(position).collect())
    }

    pub fn parts<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<Position>>, D::Error> {
        let raw = Vec::<Vec<Vec<Option<f64>>>>::deserialize(d)?;
        Ok(raw
            .into_iter()
            .map(|part| part.into_iter().map(position).collect())
            .collect())
    }
}

/// Spatial reference by well-known id and/or WKT.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_wkid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkt: Option<String>,
}

impl SpatialReference {
    pub fn from_wkid(wkid: u32) -> Self {
        Self {
            wkid: Some(wkid),
            ..Default::default()
        }
    }

    /// Prefer `latestWkid` (e.g. 3857 over 102100) when both are present.
    pub fn effective_wkid(&self) -> Option<u32> {
        self.latest_wkid.or(self.wkid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolygonShape {
    #[serde(deserialize_with = "nullable::parts")]
    pub rings: Vec<Vec<Position>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_z: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_m: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolylineShape {
    #[serde(deserialize_with = "nullable::parts")]
    pub paths: Vec<Vec<Position>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_z: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_m: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MultipointShape {
    #[serde(deserialize_with = "nullable::positions")]
    pub points: Vec<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_z: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_m: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
}

/// Point; `x: null` is how the REST API encodes an empty point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PointShape {
    pub x: Option<f64>,
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
}

/// Any Esri JSON geometry a feature service stores.
///
/// Variant order matters for untagged decoding: `Point` has no required
/// member, so it must stay last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EsriGeometry {
    Polygon(PolygonShape),
    Polyline(PolylineShape),
    Multipoint(MultipointShape),
    Point(PointShape),
}

/// `geometryType` values used by feature sets and layer metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    Multipoint,
    Polyline,
    Polygon,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GeometryKind::Point => "esriGeometryPoint",
            GeometryKind::Multipoint => "esriGeometryMultipoint",
            GeometryKind::Polyline => "esriGeometryPolyline",
            GeometryKind::Polygon => "esriGeometryPolygon",
        };
        f.write_str(s)
    }
}

impl FromStr for GeometryKind {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "esriGeometryPoint" => Ok(GeometryKind::Point),
            "esriGeometryMultipoint" => Ok(GeometryKind::Multipoint),
            "esriGeometryPolyline" => Ok(GeometryKind::Polyline),
            "esriGeometryPolygon" => Ok(GeometryKind::Polygon),
            other => Err(GeometryError::UnsupportedType(other.to_string())),
        }
    }
}

impl EsriGeometry {
    /// Decodes a geometry from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            EsriGeometry::Polygon(_) => GeometryKind::Polygon,
            EsriGeometry::Polyline(_) => GeometryKind::Polyline,
            EsriGeometry::Multipoint(_) => GeometryKind::Multipoint,
            EsriGeometry::Point(_) => GeometryKind::Point,
        }
    }

    pub fn spatial_reference(&self) -> Option<&SpatialReference> {
        match self {
            EsriGeometry::Polygon(g) => g.spatial_reference.as_ref(),
            EsriGeometry::Polyline(g) => g.spatial_reference.as_ref(),
            EsriGeometry::Multipoint(g) => g.spatial_reference.as_ref(),
            EsriGeometry::Point(g) => g.spatial_reference.as_ref(),
        }
    }

    pub fn set_spatial_reference(&mut self, sr: Option<SpatialReference>) {
        match self {
            EsriGeometry::Polygon(g) => g.spatial_reference = sr,
            EsriGeometry::Polyline(g) => g.spatial_reference = sr,
            EsriGeometry::Multipoint(g) => g.spatial_reference = sr,
            EsriGeometry::Point(g) => g.spatial_reference = sr,
        }
    }

    /// Total number of positions across all parts.
    pub fn vertex_count(&self) -> usize {
        match self {
            EsriGeometry::Polygon(g) => g.rings.iter().map(Vec::len).sum(),
            EsriGeometry::Polyline(g) => g.paths.iter().map(Vec::len).sum(),
            EsriGeometry::Multipoint(g) => g.points.len(),
            EsriGeometry::Point(g) => usize::from(g.x.is_some() && g.y.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_each_shape_by_members() {
        let poly = EsriGeometry::from_value(json!({
            "rings": [[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 0.0]]],
            "spatialReference": { "wkid": 102100, "latestWkid": 3857 }
        }))
        .unwrap();
        assert_eq!(poly.kind(), GeometryKind::Polygon);
        assert_eq!(poly.spatial_reference().unwrap().effective_wkid(), Some(3857));

        let line = EsriGeometry::from_value(json!({ "paths": [[[0, 0], [5, 5]]] })).unwrap();
        assert_eq!(line.kind(), GeometryKind::Polyline);

        let mp = EsriGeometry::from_value(json!({ "points": [[1, 2], [3, 4]] })).unwrap();
        assert_eq!(mp.kind(), GeometryKind::Multipoint);
        assert_eq!(mp.vertex_count(), 2);

        let pt = EsriGeometry::from_value(json!({ "x": -123.4, "y": 48.4 })).unwrap();
        assert_eq!(pt.kind(), GeometryKind::Point);
        assert!(!pt.is_empty());
    }

    #[test]
    fn empty_point_decodes_as_empty() {
        let pt = EsriGeometry::from_value(json!({ "x": null })).unwrap();
        assert!(pt.is_empty());
    }

    #[test]
    fn null_m_values_decode_as_nan() {
        let g = EsriGeometry::from_value(json!({
            "hasM": true,
            "rings": [[[0, 0, null], [0, 10, 1.5], [10, 10, null], [0, 0, null]]]
        }))
        .unwrap();
        let EsriGeometry::Polygon(shape) = &g else {
            panic!("expected polygon, got {g:?}");
        };
        assert!(shape.rings[0][0][2].is_nan());
        assert_eq!(shape.rings[0][1][2], 1.5);
        assert_eq!(g.vertex_count(), 4);

        let encoded = serde_json::to_value(&g).unwrap();
        assert_eq!(encoded["rings"][0][0][2], Value::Null);
    }

    #[test]
    fn unknown_members_are_rejected() {
        assert!(
            EsriGeometry::from_value(json!({
                "curveRings": [[[0, 0], { "c": [[10, 10], [5, 5]] }, [0, 0]]]
            }))
            .is_err()
        );
        assert!(EsriGeometry::from_value(json!({ "rings": "broken" })).is_err());
        assert!(EsriGeometry::from_value(json!({ "x": 1.0, "y": 2.0, "q": 3 })).is_err());
    }

    #[test]
    fn z_values_survive_encoding() {
        let src = json!({ "paths": [[[0.0, 0.0, 12.5], [5.0, 5.0, 13.0]]], "hasZ": true });
        let g = EsriGeometry::from_value(src.clone()).unwrap();
        assert_eq!(serde_json::to_value(&g).unwrap(), src);
    }

    #[test]
    fn geometry_kind_parses_service_names() {
        assert_eq!(
            "esriGeometryPolygon".parse::<GeometryKind>().unwrap(),
            GeometryKind::Polygon
        );
        assert!("esriGeometryEnvelope".parse::<GeometryKind>().is_err());
        assert_eq!(GeometryKind::Multipoint.to_string(), "esriGeometryMultipoint");
    }
}
