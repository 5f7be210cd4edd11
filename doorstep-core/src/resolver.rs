//! Entrance resolver: fuses geocoded place data with nearby road/path
//! geometry into a best-guess entrance, a drop-off point, and a
//! confidence tier.
//!
//! Each resolution is an ordered pipeline: geocode, tighten the search
//! box, fetch road/path context, anchor on the footprint boundary, try
//! the heuristic tiers in order, project a drop-off, then let any stored
//! human correction override the lot. Heuristic misses and road/path outages
//! are routine and encoded in the `method`/`confidence` fields, never
//! raised as errors; only a geocode miss is terminal.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::error::{DoorstepError, Result};
use crate::feedback::FeedbackStore;
use crate::gateway::{GeocodingProvider, PathNetwork, PathNetworkProvider, PathSegment, TtlCache};
use crate::geometry;
use crate::place::{
    BoundingBox, Confidence, EntranceEstimate, GeoPoint, GeocodeResult, PlaceId, Polygon,
    ResolutionMethod,
};

/// Tunable heuristic constants.
///
/// The defaults are operational values, not contracts; tests that pin
/// behavior should pass an explicit config.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Geocoder boxes larger than this (in squared degrees) are
    /// admin-boundary noise and get replaced by a tight box.
    pub max_geocoder_bbox_deg2: f64,
    /// Radius of the replacement search box.
    pub tight_box_radius_m: f64,
    /// Radius of the synthetic fallback box used when no footprint
    /// exists.
    pub fallback_box_radius_m: f64,
    /// Raw path distance below which a projection counts as high
    /// confidence.
    pub near_path_high_confidence_m: f64,
    /// How long assembled responses stay cached.
    pub response_ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_geocoder_bbox_deg2: 0.01,
            tight_box_radius_m: 60.0,
            fallback_box_radius_m: 30.0,
            near_path_high_confidence_m: 8.0,
            response_ttl: Duration::from_secs(60),
        }
    }
}

/// The entrance point as returned to the caller.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResolvedEntrance {
    pub lat: f64,
    pub lon: f64,
    pub confidence: Confidence,
    /// Only ever asserted by a verified correction; the heuristic does
    /// not guess at accessibility.
    pub accessible: bool,
}

/// Nearest drivable-road point to the entrance, when any road was found.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DropoffPoint {
    pub lat: f64,
    pub lon: f64,
}

/// GeoJSON polygon for the UI overlay.
#[derive(Debug, Clone, Serialize)]
pub struct GeoJsonPolygon {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl From<&Polygon> for GeoJsonPolygon {
    fn from(polygon: &Polygon) -> Self {
        Self {
            kind: "Polygon",
            coordinates: vec![polygon.ring().iter().map(|p| [p.lon, p.lat]).collect()],
        }
    }
}

/// GeoJSON line string for the UI overlay, keeping the upstream way id.
#[derive(Debug, Clone, Serialize)]
pub struct PathOverlay {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: Vec<[f64; 2]>,
}

impl From<&PathSegment> for PathOverlay {
    fn from(segment: &PathSegment) -> Self {
        Self {
            id: segment.id,
            kind: "LineString",
            coordinates: segment.points.iter().map(|p| [p.lon, p.lat]).collect(),
        }
    }
}

/// The structured result handed back to the collaborator UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntranceResponse {
    pub id: PlaceId,
    pub name: String,
    pub center: GeoPoint,
    /// `[west, south, east, north]` of the search box actually used.
    pub bbox: [f64; 4],
    pub method: ResolutionMethod,
    pub entrance: ResolvedEntrance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropoff: Option<DropoffPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footprint: Option<GeoJsonPolygon>,
    /// Walkable paths found in the search box, for the UI overlay.
    pub paths: Vec<PathOverlay>,
    pub verified_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_verified_at: Option<DateTime<Utc>>,
}

/// The resolution pipeline.
///
/// Stateless between requests apart from the response cache; providers
/// and the feedback store are injected so tests can substitute
/// deterministic fakes.
pub struct EntranceResolver {
    geocoder: Arc<dyn GeocodingProvider>,
    paths: Arc<dyn PathNetworkProvider>,
    feedback: Arc<dyn FeedbackStore>,
    config: ResolverConfig,
    response_cache: TtlCache<String, EntranceResponse>,
    /// Which cache keys belong to which place, for correction-driven
    /// eviction.
    cached_queries: DashMap<PlaceId, Vec<String>>,
}

impl EntranceResolver {
    pub fn new(
        geocoder: Arc<dyn GeocodingProvider>,
        paths: Arc<dyn PathNetworkProvider>,
        feedback: Arc<dyn FeedbackStore>,
    ) -> Self {
        Self::with_config(geocoder, paths, feedback, ResolverConfig::default())
    }

    pub fn with_config(
        geocoder: Arc<dyn GeocodingProvider>,
        paths: Arc<dyn PathNetworkProvider>,
        feedback: Arc<dyn FeedbackStore>,
        config: ResolverConfig,
    ) -> Self {
        let response_cache = TtlCache::new(config.response_ttl);
        Self {
            geocoder,
            paths,
            feedback,
            config,
            response_cache,
            cached_queries: DashMap::new(),
        }
    }

    /// Ranked geocoder candidates for an incomplete query.
    pub async fn suggest(&self, query: &str) -> Result<Vec<GeocodeResult>> {
        self.geocoder.suggest(query).await
    }

    /// Resolve the most plausible pedestrian entrance for `query`.
    #[instrument(level = "info", skip(self))]
    pub async fn resolve(&self, query: &str, near: Option<GeoPoint>) -> Result<EntranceResponse> {
        let cache_key = response_cache_key(query, near);
        if let Some(hit) = self.response_cache.get(&cache_key) {
            debug!("response cache hit");
            return Ok(hit);
        }

        let geocoded = self
            .geocoder
            .geocode(query, near)
            .await?
            .ok_or_else(|| DoorstepError::NotFound(query.to_string()))?;
        let place_id = PlaceId::derive(&geocoded.display_name, &geocoded.center);

        let search_box = self.tighten_search_box(&geocoded);
        let network = match self.paths.fetch(&search_box).await {
            Ok(network) => network,
            Err(err) => {
                warn!(error = %err, "road/path context unavailable, degrading to fallback tier");
                PathNetwork::default()
            }
        };

        let estimate = self.estimate_entrance(&geocoded, &network);
        let dropoff = dropoff_for(&estimate.point, &network);

        let correction = self.feedback.latest_correction(&place_id).await?;
        let stats = self.feedback.confirmation_stats(&place_id).await?;

        let (entrance, method) = match correction {
            Some(correction) => {
                debug!(recorded_at = %correction.recorded_at, "verified correction overrides heuristic");
                (
                    ResolvedEntrance {
                        lat: correction.entrance.lat,
                        lon: correction.entrance.lon,
                        confidence: Confidence::High,
                        accessible: correction.accessible,
                    },
                    ResolutionMethod::Correction,
                )
            }
            None => (
                ResolvedEntrance {
                    lat: estimate.point.lat,
                    lon: estimate.point.lon,
                    confidence: estimate.confidence,
                    accessible: false,
                },
                estimate.method,
            ),
        };

        let response = EntranceResponse {
            id: place_id.clone(),
            name: geocoded.display_name.clone(),
            center: geocoded.center,
            bbox: search_box.as_array(),
            method,
            entrance,
            dropoff,
            footprint: geocoded.footprint.as_ref().map(GeoJsonPolygon::from),
            paths: network.walkways.iter().map(PathOverlay::from).collect(),
            verified_count: stats.count,
            last_verified_at: stats.last_confirmed_at,
        };

        self.response_cache.insert(cache_key.clone(), response.clone());
        self.cached_queries
            .entry(place_id)
            .or_default()
            .push(cache_key);

        Ok(response)
    }

    /// Evict every cached response for a place. Must be called whenever
    /// feedback for the place is recorded, so the next resolution
    /// reflects it.
    pub fn invalidate_place(&self, place_id: &PlaceId) {
        if let Some((_, keys)) = self.cached_queries.remove(place_id) {
            for key in keys {
                self.response_cache.remove(&key);
            }
        }
    }

    /// Replace useless admin-boundary boxes with a building-scale box.
    fn tighten_search_box(&self, geocoded: &GeocodeResult) -> BoundingBox {
        let area = geocoded.bbox.area_deg2();
        if area <= self.config.max_geocoder_bbox_deg2 {
            return geocoded.bbox;
        }
        let anchor = geocoded
            .footprint
            .as_ref()
            .and_then(Polygon::centroid)
            .unwrap_or(geocoded.center);
        debug!(
            area_deg2 = area,
            "geocoder box too large for entrance search, tightening"
        );
        geometry::box_around(&anchor, self.config.tight_box_radius_m)
    }

    /// The heuristic tiers, first success wins.
    fn estimate_entrance(
        &self,
        geocoded: &GeocodeResult,
        network: &PathNetwork,
    ) -> EntranceEstimate {
        let footprint_ring = geocoded.footprint.as_ref().map(Polygon::ring);

        // Anchor for nearest-path search: the centroid clamped onto the
        // footprint boundary, so oddly shaped footprints don't pull the
        // search toward their geometric center.
        let anchor = match footprint_ring {
            Some(ring) => {
                let centroid = geocoded
                    .footprint
                    .as_ref()
                    .and_then(Polygon::centroid)
                    .unwrap_or(geocoded.center);
                geometry::clamp_to_ring(&centroid, ring)
            }
            None => geocoded.center,
        };

        // Preferred tier: project the anchor onto the nearest walkable
        // path, then clamp the projection back onto the footprint.
        let projection = network
            .walkways
            .iter()
            .filter_map(|segment| geometry::nearest_point_on_polyline(&anchor, &segment.points))
            .min_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        if let Some(projection) = projection {
            let point = match footprint_ring {
                Some(ring) => geometry::clamp_to_ring(&projection.point, ring),
                None => projection.point,
            };
            let confidence = if projection.distance_m < self.config.near_path_high_confidence_m {
                Confidence::High
            } else {
                Confidence::Medium
            };
            return EntranceEstimate {
                point,
                method: ResolutionMethod::PathProjection,
                confidence,
            };
        }

        // Fallback tier: no usable paths; clamp the geocode center onto
        // the footprint, or a synthetic box when no footprint exists.
        let point = match footprint_ring {
            Some(ring) => geometry::clamp_to_ring(&geocoded.center, ring),
            None => {
                let fallback =
                    geometry::box_around(&geocoded.center, self.config.fallback_box_radius_m);
                geometry::clamp_to_ring(&geocoded.center, &fallback.ring())
            }
        };
        EntranceEstimate {
            point,
            method: ResolutionMethod::BboxFallback,
            confidence: Confidence::Low,
        }
    }
}

/// Nearest drivable-road point to the resolved entrance.
fn dropoff_for(entrance: &GeoPoint, network: &PathNetwork) -> Option<DropoffPoint> {
    network
        .roadways
        .iter()
        .filter_map(|segment| geometry::nearest_point_on_polyline(entrance, &segment.points))
        .min_by(|a, b| a.distance_m.total_cmp(&b.distance_m))
        .map(|nearest| DropoffPoint {
            lat: nearest.point.lat,
            lon: nearest.point.lon,
        })
}

fn response_cache_key(query: &str, near: Option<GeoPoint>) -> String {
    let normalized = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    match near {
        Some(center) => format!("{normalized}@{:.3},{:.3}", center.lat, center.lon),
        None => normalized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::MemoryFeedbackStore;
    use crate::gateway::{StaticGeocoder, StaticPathNetwork};

    fn center() -> GeoPoint {
        GeoPoint::new(47.6, -122.3)
    }

    /// A footprint wider (7.5 m) than it is tall (3.3 m), so the south
    /// edge is unambiguously the nearest boundary to the centroid.
    fn footprint() -> Polygon {
        Polygon::from_ring(BoundingBox::new(-122.3001, 47.59997, -122.2999, 47.60003).ring())
            .unwrap()
    }

    fn geocoded(footprint: Option<Polygon>, bbox: BoundingBox) -> GeocodeResult {
        GeocodeResult {
            display_name: "123 Example St, Seattle".to_string(),
            center: center(),
            bbox,
            footprint,
        }
    }

    fn tight_bbox() -> BoundingBox {
        BoundingBox::new(-122.301, 47.599, -122.299, 47.601)
    }

    fn admin_bbox() -> BoundingBox {
        BoundingBox::new(-123.0, 47.0, -122.0, 48.0)
    }

    fn walkway(id: u64, lat: f64) -> PathSegment {
        PathSegment {
            id,
            points: vec![GeoPoint::new(lat, -122.301), GeoPoint::new(lat, -122.299)],
        }
    }

    fn roadway(id: u64, lat: f64) -> PathSegment {
        PathSegment {
            id,
            points: vec![GeoPoint::new(lat, -122.302), GeoPoint::new(lat, -122.298)],
        }
    }

    fn resolver_with(
        geocoder: StaticGeocoder,
        paths: StaticPathNetwork,
    ) -> (EntranceResolver, Arc<MemoryFeedbackStore>) {
        let store = Arc::new(MemoryFeedbackStore::new());
        let resolver = EntranceResolver::new(Arc::new(geocoder), Arc::new(paths), store.clone());
        (resolver, store)
    }

    #[test]
    fn test_tighten_keeps_sane_geocoder_box() {
        let (resolver, _) = resolver_with(StaticGeocoder::empty(), StaticPathNetwork::empty());
        let result = geocoded(None, tight_bbox());
        assert_eq!(resolver.tighten_search_box(&result), tight_bbox());
    }

    #[test]
    fn test_tighten_replaces_admin_boundary_box() {
        let (resolver, _) = resolver_with(StaticGeocoder::empty(), StaticPathNetwork::empty());
        let result = geocoded(None, admin_bbox());
        let tightened = resolver.tighten_search_box(&result);
        assert!(tightened.area_deg2() < 0.0001);
        assert!(tightened.contains(&center()));
    }

    #[test]
    fn test_tier_a_close_path_is_high_confidence() {
        let (resolver, _) = resolver_with(StaticGeocoder::empty(), StaticPathNetwork::empty());
        let network = PathNetwork {
            walkways: vec![walkway(1, 47.59993)],
            roadways: vec![],
        };
        let estimate =
            resolver.estimate_entrance(&geocoded(Some(footprint()), tight_bbox()), &network);

        assert_eq!(estimate.method, ResolutionMethod::PathProjection);
        assert_eq!(estimate.confidence, Confidence::High);
        // Projection clamped back onto the footprint's south edge.
        assert!((estimate.point.lat - 47.59997).abs() < 1e-9);
    }

    #[test]
    fn test_tier_a_distant_path_is_medium_confidence() {
        let (resolver, _) = resolver_with(StaticGeocoder::empty(), StaticPathNetwork::empty());
        let network = PathNetwork {
            // ~19 m south of the anchor: beyond the 8 m threshold.
            walkways: vec![walkway(1, 47.5998)],
            roadways: vec![],
        };
        let estimate =
            resolver.estimate_entrance(&geocoded(Some(footprint()), tight_bbox()), &network);

        assert_eq!(estimate.method, ResolutionMethod::PathProjection);
        assert_eq!(estimate.confidence, Confidence::Medium);
    }

    #[test]
    fn test_tier_a_picks_nearest_of_several_paths() {
        let (resolver, _) = resolver_with(StaticGeocoder::empty(), StaticPathNetwork::empty());
        let network = PathNetwork {
            walkways: vec![walkway(1, 47.6008), walkway(2, 47.59993)],
            roadways: vec![],
        };
        let estimate =
            resolver.estimate_entrance(&geocoded(Some(footprint()), tight_bbox()), &network);
        assert_eq!(estimate.confidence, Confidence::High);
    }

    #[test]
    fn test_tier_b_clamps_onto_footprint() {
        let (resolver, _) = resolver_with(StaticGeocoder::empty(), StaticPathNetwork::empty());
        let estimate = resolver.estimate_entrance(
            &geocoded(Some(footprint()), tight_bbox()),
            &PathNetwork::default(),
        );

        assert_eq!(estimate.method, ResolutionMethod::BboxFallback);
        assert_eq!(estimate.confidence, Confidence::Low);
        let nearest =
            geometry::nearest_point_on_polyline(&estimate.point, footprint().ring()).unwrap();
        assert!(nearest.distance_m < 1e-3);
    }

    #[test]
    fn test_tier_b_without_footprint_stays_near_center() {
        let (resolver, _) = resolver_with(StaticGeocoder::empty(), StaticPathNetwork::empty());
        let estimate = resolver
            .estimate_entrance(&geocoded(None, tight_bbox()), &PathNetwork::default());

        assert_eq!(estimate.method, ResolutionMethod::BboxFallback);
        assert_eq!(estimate.confidence, Confidence::Low);
        let fallback = geometry::box_around(&center(), 30.0);
        assert!(fallback.contains(&estimate.point));
        assert!(geometry::haversine_distance(&center(), &estimate.point) <= 31.0);
    }

    #[test]
    fn test_dropoff_projects_onto_nearest_road() {
        let network = PathNetwork {
            walkways: vec![],
            roadways: vec![roadway(10, 47.6002), roadway(11, 47.6050)],
        };
        let dropoff = dropoff_for(&center(), &network).unwrap();
        assert!((dropoff.lat - 47.6002).abs() < 1e-9);
        assert!((dropoff.lon - (-122.3)).abs() < 1e-9);
    }

    #[test]
    fn test_dropoff_absent_without_roads() {
        assert!(dropoff_for(&center(), &PathNetwork::default()).is_none());
    }

    #[tokio::test]
    async fn test_resolve_misses_with_not_found() {
        let (resolver, _) = resolver_with(StaticGeocoder::empty(), StaticPathNetwork::empty());
        let err = resolver.resolve("nowhere at all", None).await.unwrap_err();
        assert!(matches!(err, DoorstepError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_serves_repeat_queries_from_cache() {
        let geocoder = StaticGeocoder::new(vec![geocoded(None, tight_bbox())]);
        let store = Arc::new(MemoryFeedbackStore::new());
        let geocoder = Arc::new(geocoder);
        let resolver = EntranceResolver::new(
            geocoder.clone(),
            Arc::new(StaticPathNetwork::empty()),
            store,
        );

        let first = resolver.resolve("123 Example St", None).await.unwrap();
        let second = resolver.resolve("123 Example St", None).await.unwrap();
        assert_eq!(first.id, second.id);
        // The second resolution never reached the providers.
        assert_eq!(geocoder.call_count(), 1);
    }

    #[tokio::test]
    async fn test_resolve_degrades_when_path_service_fails() {
        let geocoder = StaticGeocoder::new(vec![geocoded(None, tight_bbox())]);
        let (resolver, _) = resolver_with(geocoder, StaticPathNetwork::failing());

        let response = resolver.resolve("123 Example St", None).await.unwrap();
        assert_eq!(response.method, ResolutionMethod::BboxFallback);
        assert_eq!(response.entrance.confidence, Confidence::Low);
        assert!(response.dropoff.is_none());
    }

    #[tokio::test]
    async fn test_correction_overrides_heuristic_after_invalidation() {
        let geocoder = StaticGeocoder::new(vec![geocoded(None, tight_bbox())]);
        let (resolver, store) = resolver_with(geocoder, StaticPathNetwork::empty());

        let first = resolver.resolve("123 Example St", None).await.unwrap();
        assert_eq!(first.method, ResolutionMethod::BboxFallback);

        let corrected = GeoPoint::new(47.60021, -122.29984);
        store.record_correction_sync(&first.id, corrected, true);
        resolver.invalidate_place(&first.id);

        let second = resolver.resolve("123 Example St", None).await.unwrap();
        assert_eq!(second.method, ResolutionMethod::Correction);
        assert_eq!(second.entrance.confidence, Confidence::High);
        assert!(second.entrance.accessible);
        assert_eq!(second.entrance.lat, corrected.lat);
        assert_eq!(second.entrance.lon, corrected.lon);
    }

    #[test]
    fn test_response_cache_key_separates_near_hints() {
        assert_ne!(
            response_cache_key("cafe", Some(center())),
            response_cache_key("cafe", None)
        );
        assert_eq!(
            response_cache_key("  Cafe   Ladro ", None),
            response_cache_key("cafe ladro", None)
        );
    }
}
