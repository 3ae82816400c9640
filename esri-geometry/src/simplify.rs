//! Douglas–Peucker generalization of Esri geometries.
//!
//! Tolerance is expressed in the geometry's native spatial reference units
//! (degrees for 4326, metres for most projected systems). No unit conversion
//! is attempted.

use geo::{Coord, LineString, SimplifyIdx};
use tracing::trace;

use crate::{
    errors::{GeometryError, Result},
    model::{EsriGeometry, PolygonShape, PolylineShape, Position},
};

/// Smallest closed ring: three distinct vertices plus the closing one.
const MIN_RING_POSITIONS: usize = 4;
const MIN_PATH_POSITIONS: usize = 2;

/// Returns a simplified copy of `geometry`.
///
/// Each ring or path is generalized on its own. The vertices that are kept
/// are the original positions, so z/m values are preserved. A part that would
/// degenerate (ring under four positions, path under two) is left as is.
/// Points and multipoints are returned unchanged.
pub fn simplify(geometry: &EsriGeometry, tolerance: f64) -> Result<EsriGeometry> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(GeometryError::InvalidTolerance(tolerance));
    }

    let out = match geometry {
        EsriGeometry::Polygon(shape) => EsriGeometry::Polygon(PolygonShape {
            rings: shape
                .rings
                .iter()
                .map(|ring| simplify_part(ring, tolerance, MIN_RING_POSITIONS))
                .collect(),
            ..shape.clone()
        }),
        EsriGeometry::Polyline(shape) => EsriGeometry::Polyline(PolylineShape {
            paths: shape
                .paths
                .iter()
                .map(|path| simplify_part(path, tolerance, MIN_PATH_POSITIONS))
                .collect(),
            ..shape.clone()
        }),
        other => other.clone(),
    };

    trace!(
        kind = %geometry.kind(),
        before = geometry.vertex_count(),
        after = out.vertex_count(),
        tolerance,
        "geometry simplified"
    );
    Ok(out)
}

fn simplify_part(part: &[Position], tolerance: f64, min_len: usize) -> Vec<Position> {
    if part.len() <= min_len {
        return part.to_vec();
    }

    let coords: Option<Vec<Coord<f64>>> = part
        .iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Some(Coord { x: *x, y: *y }),
            _ => None,
        })
        .collect();
    let Some(coords) = coords else {
        return part.to_vec();
    };

    let keep = LineString::new(coords).simplify_idx(&tolerance);
    if keep.len() < min_len {
        return part.to_vec();
    }
    keep.into_iter().map(|i| part[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PointShape, SpatialReference};

    fn zigzag_path(n: usize, amplitude: f64) -> Vec<Position> {
        (0..n)
            .map(|i| {
                let y = if i % 2 == 0 { 0.0 } else { amplitude };
                vec![i as f64 * 10.0, y]
            })
            .collect()
    }

    #[test]
    fn removes_vertices_within_tolerance() {
        let line = EsriGeometry::Polyline(PolylineShape {
            paths: vec![zigzag_path(11, 1.0)],
            has_z: None,
            has_m: None,
            spatial_reference: Some(SpatialReference::from_wkid(3005)),
        });

        let out = simplify(&line, 5.0).unwrap();
        let EsriGeometry::Polyline(shape) = &out else {
            panic!("kind changed");
        };
        assert_eq!(shape.paths[0], vec![vec![0.0, 0.0], vec![100.0, 0.0]]);
        assert_eq!(out.spatial_reference(), line.spatial_reference());
    }

    #[test]
    fn keeps_vertices_outside_tolerance() {
        let line = EsriGeometry::Polyline(PolylineShape {
            paths: vec![zigzag_path(5, 50.0)],
            has_z: None,
            has_m: None,
            spatial_reference: None,
        });
        let out = simplify(&line, 5.0).unwrap();
        assert_eq!(out, line);
    }

    #[test]
    fn ring_never_collapses_below_four_positions() {
        // Thin sliver: every interior vertex sits within tolerance of the chord.
        let ring = vec![
            vec![0.0, 0.0],
            vec![50.0, 1.0],
            vec![100.0, 0.0],
            vec![50.0, -1.0],
            vec![0.0, 0.0],
        ];
        let poly = EsriGeometry::Polygon(PolygonShape {
            rings: vec![ring.clone()],
            has_z: None,
            has_m: None,
            spatial_reference: None,
        });
        let out = simplify(&poly, 5.0).unwrap();
        let EsriGeometry::Polygon(shape) = out else {
            panic!("kind changed");
        };
        assert!(shape.rings[0].len() >= 4);
        assert_eq!(shape.rings[0].first(), shape.rings[0].last());
    }

    #[test]
    fn preserves_z_values_of_kept_vertices() {
        let path = vec![
            vec![0.0, 0.0, 7.0],
            vec![10.0, 0.1, 8.0],
            vec![20.0, 0.0, 9.0],
        ];
        let line = EsriGeometry::Polyline(PolylineShape {
            paths: vec![path],
            has_z: Some(true),
            has_m: None,
            spatial_reference: None,
        });
        let EsriGeometry::Polyline(shape) = simplify(&line, 1.0).unwrap() else {
            panic!("kind changed");
        };
        assert_eq!(shape.paths[0], vec![vec![0.0, 0.0, 7.0], vec![20.0, 0.0, 9.0]]);
        assert_eq!(shape.has_z, Some(true));
    }

    #[test]
    fn points_are_untouched() {
        let pt = EsriGeometry::Point(PointShape {
            x: Some(1.0),
            y: Some(2.0),
            z: None,
            m: None,
            spatial_reference: None,
        });
        assert_eq!(simplify(&pt, 5.0).unwrap(), pt);
    }

    #[test]
    fn rejects_bad_tolerance() {
        let pt = EsriGeometry::Point(PointShape {
            x: Some(1.0),
            y: Some(2.0),
            z: None,
            m: None,
            spatial_reference: None,
        });
        assert!(matches!(
            simplify(&pt, -1.0),
            Err(GeometryError::InvalidTolerance(_))
        ));
        assert!(simplify(&pt, f64::NAN).is_err());
    }
}
