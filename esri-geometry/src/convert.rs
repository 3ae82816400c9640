//! Esri JSON → `geo` types and WKT.
//!
//! Polygon rings come as one flat list. Exterior rings are clockwise, holes
//! counter-clockwise; each hole is attached to the exterior that contains its
//! first vertex.

use geo::{
    Contains, Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon, Winding,
};
use wkt::ToWkt;

use crate::{
    errors::{GeometryError, Result},
    model::{EsriGeometry, Position},
};

/// Converts an Esri geometry into a `geo` geometry (x/y only).
///
/// Returns `Ok(None)` for empty geometries.
pub fn to_geo(geometry: &EsriGeometry) -> Result<Option<Geometry<f64>>> {
    let out = match geometry {
        EsriGeometry::Point(p) => match (p.x, p.y) {
            (Some(x), Some(y)) => Some(Geometry::Point(Point::new(x, y))),
            _ => None,
        },
        EsriGeometry::Multipoint(mp) => {
            let points = mp
                .points
                .iter()
                .map(|p| coord(p).map(Point::from))
                .collect::<Result<Vec<_>>>()?;
            (!points.is_empty()).then(|| Geometry::MultiPoint(MultiPoint::new(points)))
        }
        EsriGeometry::Polyline(pl) => {
            let mut lines = pl
                .paths
                .iter()
                .filter(|path| !path.is_empty())
                .map(|path| line_string(path))
                .collect::<Result<Vec<_>>>()?;
            match lines.len() {
                0 => None,
                1 => lines.pop().map(Geometry::LineString),
                _ => Some(Geometry::MultiLineString(MultiLineString::new(lines))),
            }
        }
        EsriGeometry::Polygon(pg) => {
            let rings = pg
                .rings
                .iter()
                .filter(|ring| !ring.is_empty())
                .map(|ring| line_string(ring))
                .collect::<Result<Vec<_>>>()?;
            let mut polygons = group_rings(rings);
            match polygons.len() {
                0 => None,
                1 => polygons.pop().map(Geometry::Polygon),
                _ => Some(Geometry::MultiPolygon(MultiPolygon::new(polygons))),
            }
        }
    };
    Ok(out)
}

/// Renders a `geo` geometry as WKT.
pub fn to_wkt(geometry: &Geometry<f64>) -> String {
    geometry.wkt_string()
}

fn coord(p: &Position) -> Result<Coord<f64>> {
    match p.as_slice() {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        [_, _, ..] => Err(GeometryError::NonFiniteCoordinate),
        other => Err(GeometryError::InvalidPosition(other.len())),
    }
}

fn line_string(part: &[Position]) -> Result<LineString<f64>> {
    let coords = part.iter().map(coord).collect::<Result<Vec<_>>>()?;
    Ok(LineString::new(coords))
}

fn group_rings(rings: Vec<LineString<f64>>) -> Vec<Polygon<f64>> {
    let (exteriors, holes): (Vec<_>, Vec<_>) = rings.into_iter().partition(|r| !r.is_ccw());

    // Some producers write every ring counter-clockwise; treat them all as shells.
    if exteriors.is_empty() {
        return holes.into_iter().map(|r| Polygon::new(r, vec![])).collect();
    }

    let mut shells: Vec<(LineString<f64>, Vec<LineString<f64>>)> =
        exteriors.into_iter().map(|r| (r, Vec::new())).collect();

    for hole in holes {
        let probe = hole.0.first().copied().map(Point::from);
        let owner = probe
            .and_then(|pt| {
                shells
                    .iter()
                    .position(|(shell, _)| Polygon::new(shell.clone(), vec![]).contains(&pt))
            })
            .unwrap_or(0);
        shells[owner].1.push(hole);
    }

    shells
        .into_iter()
        .map(|(exterior, interiors)| Polygon::new(exterior, interiors))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn geo_of(value: serde_json::Value) -> Option<Geometry<f64>> {
        to_geo(&EsriGeometry::from_value(value).unwrap()).unwrap()
    }

    #[test]
    fn point_and_multipoint() {
        assert_eq!(
            geo_of(json!({ "x": 1.5, "y": 2.5 })),
            Some(Geometry::Point(Point::new(1.5, 2.5)))
        );
        let Some(Geometry::MultiPoint(mp)) = geo_of(json!({ "points": [[0, 0], [1, 1]] })) else {
            panic!("expected multipoint");
        };
        assert_eq!(mp.0.len(), 2);
        assert_eq!(geo_of(json!({ "x": null })), None);
    }

    #[test]
    fn polyline_uses_every_path() {
        let single = geo_of(json!({ "paths": [[[0, 0], [1, 1]]] }));
        assert!(matches!(single, Some(Geometry::LineString(_))));

        let multi = geo_of(json!({ "paths": [[[0, 0], [1, 1]], [[5, 5], [6, 6]]] }));
        let Some(Geometry::MultiLineString(mls)) = multi else {
            panic!("expected multilinestring");
        };
        assert_eq!(mls.0.len(), 2);
    }

    #[test]
    fn polygon_hole_is_attached_to_containing_shell() {
        // Clockwise shells, counter-clockwise hole inside the second shell.
        let g = geo_of(json!({ "rings": [
            [[0, 0], [0, 10], [10, 10], [10, 0], [0, 0]],
            [[20, 0], [20, 10], [30, 10], [30, 0], [20, 0]],
            [[22, 2], [28, 2], [28, 8], [22, 8], [22, 2]]
        ]}));
        let Some(Geometry::MultiPolygon(mp)) = g else {
            panic!("expected multipolygon");
        };
        assert_eq!(mp.0.len(), 2);
        assert!(mp.0[0].interiors().is_empty());
        assert_eq!(mp.0[1].interiors().len(), 1);
    }

    #[test]
    fn single_ring_polygon_to_wkt() {
        let g = geo_of(json!({ "rings": [[[0, 0], [0, 1], [1, 1], [0, 0]]] })).unwrap();
        let wkt = to_wkt(&g);
        assert!(wkt.starts_with("POLYGON"), "{wkt}");
        assert!(!wkt.starts_with("MULTIPOLYGON"), "{wkt}");
    }

    #[test]
    fn short_position_is_an_error() {
        let g = EsriGeometry::from_value(json!({ "paths": [[[0], [1, 1]]] })).unwrap();
        assert!(matches!(to_geo(&g), Err(GeometryError::InvalidPosition(1))));
    }

    #[test]
    fn null_m_is_ignored_but_null_x_is_an_error() {
        let with_m = geo_of(json!({ "hasM": true, "paths": [[[0, 0, null], [1, 1, null]]] }));
        assert!(matches!(with_m, Some(Geometry::LineString(_))));

        let g = EsriGeometry::from_value(json!({ "paths": [[[null, 0], [1, 1]]] })).unwrap();
        assert!(matches!(to_geo(&g), Err(GeometryError::NonFiniteCoordinate)));
    }
}
