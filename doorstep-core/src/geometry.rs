//! Geometry kernel: pure, deterministic coordinate math.
//!
//! Every function here is synchronous, allocation-light, and O(n) in the
//! vertex count of its input, so the resolver can call them on every
//! request without budgeting.
//!
//! Distances are always scored on the great circle; the parametric
//! projection used to find candidate points treats lon/lat as a plane,
//! which is accurate enough at building scale (tens of meters).

use crate::place::{BoundingBox, GeoPoint};

/// Mean Earth radius in meters, shared by all conversions in this module.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distance below which a point counts as already lying on a boundary.
const ON_BOUNDARY_EPSILON_M: f64 = 1e-3;

/// A projection result: the closest point on some geometry and the
/// great-circle distance to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPoint {
    pub point: GeoPoint,
    pub distance_m: f64,
}

/// Great-circle (haversine) distance between two points, in meters.
///
/// Symmetric, and exactly zero for identical inputs.
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Closest point to `point` on the polyline described by `vertices`.
///
/// Each consecutive segment is searched with a planar parametric
/// projection clamped to `[0, 1]`; candidates are scored by true
/// great-circle distance and the minimum wins. Zero-length segments
/// contribute their single vertex (`t = 0`). Returns `None` for an
/// empty polyline.
pub fn nearest_point_on_polyline(point: &GeoPoint, vertices: &[GeoPoint]) -> Option<NearestPoint> {
    let first = vertices.first()?;
    let mut best = NearestPoint {
        point: *first,
        distance_m: haversine_distance(point, first),
    };

    for segment in vertices.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        let dx = b.lon - a.lon;
        let dy = b.lat - a.lat;
        let len2 = dx * dx + dy * dy;

        let t = if len2 == 0.0 {
            0.0
        } else {
            (((point.lon - a.lon) * dx + (point.lat - a.lat) * dy) / len2).clamp(0.0, 1.0)
        };

        let candidate = GeoPoint::new(a.lat + t * dy, a.lon + t * dx);
        let distance_m = haversine_distance(point, &candidate);
        if distance_m < best.distance_m {
            best = NearestPoint {
                point: candidate,
                distance_m,
            };
        }
    }

    Some(best)
}

/// Signed-area (shoelace) centroid of a closed ring.
///
/// Returns `None` when the ring encloses no area (fewer than three
/// distinct vertices, or all vertices collinear).
pub fn ring_centroid(ring: &[GeoPoint]) -> Option<GeoPoint> {
    if ring.len() < 3 {
        return None;
    }

    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;

    for segment in ring.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        let cross = a.lon * b.lat - b.lon * a.lat;
        twice_area += cross;
        cx += (a.lon + b.lon) * cross;
        cy += (a.lat + b.lat) * cross;
    }

    if twice_area.abs() < f64::EPSILON {
        return None;
    }

    Some(GeoPoint::new(cy / (3.0 * twice_area), cx / (3.0 * twice_area)))
}

/// An axis-aligned box extending `radius_m` meters from `center`.
///
/// The longitude delta is widened by `1 / cos(lat)` so the box stays
/// roughly square on the ground; latitudes are clamped to the valid
/// range near the poles.
pub fn box_around(center: &GeoPoint, radius_m: f64) -> BoundingBox {
    let d_lat = (radius_m / EARTH_RADIUS_M).to_degrees();
    let cos_lat = center.lat.to_radians().cos();
    let d_lon = if cos_lat.abs() < 1e-9 {
        180.0
    } else {
        d_lat / cos_lat
    };

    BoundingBox::new(
        center.lon - d_lon,
        (center.lat - d_lat).max(-90.0),
        center.lon + d_lon,
        (center.lat + d_lat).min(90.0),
    )
}

/// Clamp `point` onto the boundary of a closed ring.
///
/// A point already on the boundary (within a millimeter) is returned
/// unchanged, so ring vertices map to themselves. An empty ring also
/// returns the point unchanged.
pub fn clamp_to_ring(point: &GeoPoint, ring: &[GeoPoint]) -> GeoPoint {
    match nearest_point_on_polyline(point, ring) {
        Some(nearest) if nearest.distance_m > ON_BOUNDARY_EPSILON_M => nearest.point,
        _ => *point,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seattle() -> GeoPoint {
        GeoPoint::new(47.6, -122.3)
    }

    #[test]
    fn test_distance_zero_for_identical_points() {
        let p = seattle();
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = seattle();
        let b = GeoPoint::new(47.61, -122.33);
        assert_eq!(haversine_distance(&a, &b), haversine_distance(&b, &a));
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        // One degree of latitude is ~111.19 km on a 6371 km sphere.
        let a = GeoPoint::new(47.0, -122.3);
        let b = GeoPoint::new(48.0, -122.3);
        let d = haversine_distance(&a, &b);
        assert!((d - 111_195.0).abs() < 50.0, "got {d}");
    }

    #[test]
    fn test_nearest_point_empty_polyline() {
        assert!(nearest_point_on_polyline(&seattle(), &[]).is_none());
    }

    #[test]
    fn test_nearest_point_projects_inside_segment() {
        // Horizontal segment through lat 47.6; query point slightly north
        // of its midpoint should project straight down onto it.
        let polyline = [GeoPoint::new(47.6, -122.31), GeoPoint::new(47.6, -122.29)];
        let query = GeoPoint::new(47.6005, -122.3);
        let nearest = nearest_point_on_polyline(&query, &polyline).unwrap();
        assert!((nearest.point.lat - 47.6).abs() < 1e-9);
        assert!((nearest.point.lon - (-122.3)).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_point_clamps_to_endpoints() {
        let polyline = [GeoPoint::new(47.6, -122.31), GeoPoint::new(47.6, -122.29)];
        // Query beyond the eastern endpoint: projection must clamp to it
        // rather than extrapolate past t = 1.
        let query = GeoPoint::new(47.6, -122.28);
        let nearest = nearest_point_on_polyline(&query, &polyline).unwrap();
        assert!((nearest.point.lon - (-122.29)).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_point_beats_both_endpoints() {
        let polyline = [GeoPoint::new(47.6, -122.31), GeoPoint::new(47.6, -122.29)];
        let query = GeoPoint::new(47.6005, -122.3);
        let nearest = nearest_point_on_polyline(&query, &polyline).unwrap();
        assert!(nearest.distance_m <= haversine_distance(&query, &polyline[0]));
        assert!(nearest.distance_m <= haversine_distance(&query, &polyline[1]));
    }

    #[test]
    fn test_nearest_point_zero_length_segment() {
        // Degenerate segment must not divide by zero.
        let p = seattle();
        let polyline = [p, p];
        let query = GeoPoint::new(47.601, -122.3);
        let nearest = nearest_point_on_polyline(&query, &polyline).unwrap();
        assert_eq!(nearest.point, p);
    }

    #[test]
    fn test_centroid_of_square() {
        let ring = [
            GeoPoint::new(47.0, -122.0),
            GeoPoint::new(47.0, -121.0),
            GeoPoint::new(48.0, -121.0),
            GeoPoint::new(48.0, -122.0),
            GeoPoint::new(47.0, -122.0),
        ];
        let centroid = ring_centroid(&ring).unwrap();
        assert!((centroid.lat - 47.5).abs() < 1e-9);
        assert!((centroid.lon - (-121.5)).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_degenerate_ring() {
        // Collinear ring encloses no area.
        let ring = [
            GeoPoint::new(47.0, -122.0),
            GeoPoint::new(47.0, -121.0),
            GeoPoint::new(47.0, -120.0),
            GeoPoint::new(47.0, -122.0),
        ];
        assert!(ring_centroid(&ring).is_none());
        assert!(ring_centroid(&[]).is_none());
    }

    #[test]
    fn test_box_around_contains_center() {
        let center = seattle();
        let bbox = box_around(&center, 60.0);
        assert!(bbox.contains(&center));
    }

    #[test]
    fn test_box_around_is_roughly_square_on_the_ground() {
        let center = seattle();
        let bbox = box_around(&center, 60.0);
        let west_mid = GeoPoint::new(center.lat, bbox.west);
        let south_mid = GeoPoint::new(bbox.south, center.lon);
        let east_west = haversine_distance(&center, &west_mid);
        let north_south = haversine_distance(&center, &south_mid);
        assert!((east_west - 60.0).abs() < 1.0, "got {east_west}");
        assert!((north_south - 60.0).abs() < 1.0, "got {north_south}");
    }

    #[test]
    fn test_clamp_returns_vertices_unchanged() {
        let ring = crate::place::BoundingBox::new(-122.31, 47.59, -122.29, 47.61).ring();
        for vertex in &ring {
            assert_eq!(clamp_to_ring(vertex, &ring), *vertex);
        }
    }

    #[test]
    fn test_clamp_moves_interior_point_to_boundary() {
        let bbox = crate::place::BoundingBox::new(-122.31, 47.59, -122.29, 47.61);
        let ring = bbox.ring();
        let clamped = clamp_to_ring(&bbox.center(), &ring);
        assert_ne!(clamped, bbox.center());
        let back = nearest_point_on_polyline(&clamped, &ring).unwrap();
        assert!(back.distance_m < 1e-3);
    }

    #[test]
    fn test_clamp_with_empty_ring_is_identity() {
        let p = seattle();
        assert_eq!(clamp_to_ring(&p, &[]), p);
    }
}
