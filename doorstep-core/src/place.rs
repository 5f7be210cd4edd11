//! Value types shared across the resolution pipeline.
//!
//! Everything here is plain data: WGS84 points, normalized bounding boxes,
//! closed polygon rings, geocoder output, and the stable place identifier
//! that joins geocode results with corrections and confirmations.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

/// Coordinate rounding applied before hashing into a [`PlaceId`].
///
/// Five decimal places is roughly 1 m of latitude, which is well below the
/// jitter between two geocodes of the same building and well above the
/// spacing of distinct buildings.
const PLACE_ID_COORD_DECIMALS: usize = 5;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether the coordinate lies in the valid WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// An axis-aligned bounding box, always normalized so that
/// `west < east` and `south < north`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Build a normalized box from two corner pairs in any order.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west: west.min(east),
            south: south.min(north),
            east: west.max(east),
            north: south.max(north),
        }
    }

    /// Box area in squared degrees. Used for the geocoder sanity check,
    /// not for any ground-distance computation.
    pub fn area_deg2(&self) -> f64 {
        (self.east - self.west) * (self.north - self.south)
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lon >= self.west
            && point.lon <= self.east
            && point.lat >= self.south
            && point.lat <= self.north
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// `[west, south, east, north]`, the order used on the wire.
    pub fn as_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    /// The box outline as a closed ring, counter-clockwise from the
    /// south-west corner.
    pub fn ring(&self) -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(self.south, self.west),
            GeoPoint::new(self.south, self.east),
            GeoPoint::new(self.north, self.east),
            GeoPoint::new(self.north, self.west),
            GeoPoint::new(self.south, self.west),
        ]
    }
}

/// A building footprint: the closed outer ring of a polygon.
///
/// Holes are ignored and multipolygons are reduced to their first outer
/// ring at the gateway boundary, so a single ring is all the pipeline
/// ever sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    ring: Vec<GeoPoint>,
}

impl Polygon {
    /// Build a polygon from an outer ring, closing it if the input is
    /// open. Returns `None` when fewer than three distinct vertices
    /// remain.
    pub fn from_ring(mut points: Vec<GeoPoint>) -> Option<Self> {
        if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) {
            if first != last {
                points.push(first);
            }
        }
        // A closed ring needs at least a triangle: 3 vertices + repeat.
        if points.len() < 4 {
            return None;
        }
        Some(Self { ring: points })
    }

    pub fn ring(&self) -> &[GeoPoint] {
        &self.ring
    }

    /// Signed-area centroid of the outer ring; `None` when degenerate.
    pub fn centroid(&self) -> Option<GeoPoint> {
        crate::geometry::ring_centroid(&self.ring)
    }
}

/// Normalized output of a geocoding provider.
///
/// Provider-specific shapes (stringly-typed coordinates, reversed
/// bounding-box order, GeoJSON variants) are flattened into this type at
/// the gateway boundary and never leak further in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub display_name: String,
    pub center: GeoPoint,
    pub bbox: BoundingBox,
    pub footprint: Option<Polygon>,
}

/// Stable identifier for "the same place" across repeated queries.
///
/// A SHA3-256 content hash over the display name and the center rounded
/// to five decimal places, hex-encoded. Two geocode queries that resolve
/// to the same underlying place hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceId(String);

impl PlaceId {
    pub fn derive(display_name: &str, center: &GeoPoint) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(display_name.as_bytes());
        hasher.update(
            format!(
                "|{:.prec$}|{:.prec$}",
                center.lat,
                center.lon,
                prec = PLACE_ID_COORD_DECIMALS
            )
            .as_bytes(),
        );
        Self(hex::encode(hasher.finalize()))
    }

    /// Wrap an identifier received from a caller (e.g. a feedback
    /// submission echoing back a previously resolved id).
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How much to trust a produced entrance point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("high"),
            Self::Medium => f.write_str("medium"),
            Self::Low => f.write_str("low"),
        }
    }
}

/// Which strategy produced the entrance point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Anchor projected onto the nearest walkable path, clamped back
    /// onto the footprint boundary when one exists.
    PathProjection,
    /// No usable paths: geocode center clamped onto the footprint or a
    /// synthetic fallback box.
    BboxFallback,
    /// A stored human correction superseded the heuristic.
    Correction,
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathProjection => f.write_str("path_projection"),
            Self::BboxFallback => f.write_str("bbox_fallback"),
            Self::Correction => f.write_str("correction"),
        }
    }
}

/// A heuristic entrance guess, before any correction override.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntranceEstimate {
    pub point: GeoPoint,
    pub method: ResolutionMethod,
    pub confidence: Confidence,
}
