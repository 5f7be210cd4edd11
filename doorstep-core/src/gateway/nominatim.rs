//! Nominatim-style geocoding client.
//!
//! Talks to the free public search endpoint, which asks for an absolute
//! maximum of one request per second and an identifying User-Agent. The
//! client keeps inside that policy with a token bucket (capacity 2,
//! refill 1/s) and a five-minute cache per mode; a cache hit never
//! touches the bucket.
//!
//! The provider's response is stringly typed and uses a
//! `[south, north, west, east]` bounding-box order. All of that is
//! normalized into [`GeocodeResult`] here and never leaks further in.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::cache::TtlCache;
use super::http::{UpstreamClient, UpstreamConfig};
use super::limiter::TokenBucket;
use super::GeocodingProvider;
use crate::error::{DoorstepError, Result};
use crate::geometry;
use crate::place::{BoundingBox, GeoPoint, GeocodeResult, Polygon};

/// Default public endpoint.
const DEFAULT_API_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Courtesy bucket toward the geocoder: burst of 2, sustained 1/s.
const BUCKET_CAPACITY: f64 = 2.0;
const BUCKET_REFILL_PER_SEC: f64 = 1.0;

/// Suggestion and detail responses are stable for minutes at a time.
const SUGGESTION_TTL: Duration = Duration::from_secs(300);
const DETAIL_TTL: Duration = Duration::from_secs(300);

/// Candidates returned in suggestion mode.
const SUGGESTION_LIMIT: usize = 5;

/// Ground radius of the bias viewbox applied around a `near` hint.
const NEAR_BIAS_RADIUS_M: f64 = 5_000.0;

/// Configuration for the geocoding client.
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    /// Search endpoint URL.
    pub api_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for transient errors.
    pub max_retries: u32,
    /// Identifying User-Agent sent with every request.
    pub user_agent: String,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        let upstream = UpstreamConfig::default();
        Self {
            api_url: std::env::var("NOMINATIM_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            timeout: upstream.timeout,
            max_retries: upstream.max_retries,
            user_agent: upstream.user_agent,
        }
    }
}

/// One candidate from the raw search response.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: String,
    lat: String,
    lon: String,
    /// Provider order: `[south, north, west, east]`, as strings.
    boundingbox: [String; 4],
    #[serde(default)]
    geojson: Option<serde_json::Value>,
}

/// Geocoding client for a Nominatim-style API.
pub struct NominatimGeocoder {
    client: UpstreamClient,
    base_url: Url,
    bucket: TokenBucket,
    suggestion_cache: TtlCache<String, Vec<GeocodeResult>>,
    detail_cache: TtlCache<String, GeocodeResult>,
}

impl NominatimGeocoder {
    /// Create a client with default settings (env-overridable endpoint).
    pub fn new() -> Result<Self> {
        Self::with_config(NominatimConfig::default())
    }

    pub fn with_config(config: NominatimConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| DoorstepError::InvalidInput(format!("bad geocoder URL: {e}")))?;
        let client = UpstreamClient::new(UpstreamConfig {
            timeout: config.timeout,
            max_retries: config.max_retries,
            user_agent: config.user_agent,
        })?;
        Ok(Self {
            client,
            base_url,
            bucket: TokenBucket::new(BUCKET_CAPACITY, BUCKET_REFILL_PER_SEC),
            suggestion_cache: TtlCache::new(SUGGESTION_TTL),
            detail_cache: TtlCache::new(DETAIL_TTL),
        })
    }

    fn search_url(&self, query: &str, limit: usize, detail: bool, near: Option<GeoPoint>) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", query)
                .append_pair("format", "jsonv2")
                .append_pair("limit", &limit.to_string())
                .append_pair("addressdetails", "0");
            if detail {
                pairs.append_pair("polygon_geojson", "1");
            }
            if let Some(center) = near {
                let bias = geometry::box_around(&center, NEAR_BIAS_RADIUS_M);
                pairs.append_pair(
                    "viewbox",
                    &format!(
                        "{:.6},{:.6},{:.6},{:.6}",
                        bias.west, bias.north, bias.east, bias.south
                    ),
                );
            }
        }
        url
    }
}

#[async_trait]
impl GeocodingProvider for NominatimGeocoder {
    #[instrument(level = "debug", skip(self))]
    async fn suggest(&self, query: &str) -> Result<Vec<GeocodeResult>> {
        let key = normalize_query(query);
        if let Some(hit) = self.suggestion_cache.get(&key) {
            debug!("suggestion cache hit");
            return Ok(hit);
        }
        if !self.bucket.try_take("search") {
            return Err(DoorstepError::RateLimited("geocoding"));
        }

        let url = self.search_url(query, SUGGESTION_LIMIT, false, None);
        let raw: Vec<NominatimPlace> = self.client.get_json("geocoder", url).await?;
        let results: Vec<GeocodeResult> = raw.into_iter().filter_map(normalize_place).collect();

        self.suggestion_cache.insert(key, results.clone());
        Ok(results)
    }

    #[instrument(level = "debug", skip(self))]
    async fn geocode(&self, query: &str, near: Option<GeoPoint>) -> Result<Option<GeocodeResult>> {
        let key = detail_cache_key(query, near);
        if let Some(hit) = self.detail_cache.get(&key) {
            debug!("detail cache hit");
            return Ok(Some(hit));
        }
        if !self.bucket.try_take("search") {
            return Err(DoorstepError::RateLimited("geocoding"));
        }

        let url = self.search_url(query, 1, true, near);
        let raw: Vec<NominatimPlace> = self.client.get_json("geocoder", url).await?;
        let result = raw.into_iter().find_map(normalize_place);

        if let Some(ref found) = result {
            self.detail_cache.insert(key, found.clone());
        }
        Ok(result)
    }
}

/// Collapse a query into its cache key: trimmed, lowercased, single
/// spaces.
fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn detail_cache_key(query: &str, near: Option<GeoPoint>) -> String {
    match near {
        Some(center) => format!(
            "{}@{:.3},{:.3}",
            normalize_query(query),
            center.lat,
            center.lon
        ),
        None => normalize_query(query),
    }
}

/// Normalize one raw candidate; malformed candidates are dropped with a
/// warning rather than failing the whole response.
fn normalize_place(raw: NominatimPlace) -> Option<GeocodeResult> {
    let lat: f64 = raw.lat.parse().ok()?;
    let lon: f64 = raw.lon.parse().ok()?;
    let center = GeoPoint::new(lat, lon);
    if !center.is_valid() {
        warn!(display_name = %raw.display_name, "dropping candidate with out-of-range center");
        return None;
    }

    let south: f64 = raw.boundingbox[0].parse().ok()?;
    let north: f64 = raw.boundingbox[1].parse().ok()?;
    let west: f64 = raw.boundingbox[2].parse().ok()?;
    let east: f64 = raw.boundingbox[3].parse().ok()?;

    Some(GeocodeResult {
        footprint: raw.geojson.as_ref().and_then(footprint_from_geojson),
        display_name: raw.display_name,
        center,
        bbox: BoundingBox::new(west, south, east, north),
    })
}

/// Reduce a GeoJSON geometry to its outer ring.
///
/// Polygons keep their first (outer) ring; multipolygons are reduced to
/// the first polygon's outer ring; point and line geometries carry no
/// footprint.
fn footprint_from_geojson(geojson: &serde_json::Value) -> Option<Polygon> {
    let coordinates = geojson.get("coordinates")?;
    let ring = match geojson.get("type")?.as_str()? {
        "Polygon" => coordinates.get(0)?,
        "MultiPolygon" => coordinates.get(0)?.get(0)?,
        _ => return None,
    };

    let points: Vec<GeoPoint> = ring
        .as_array()?
        .iter()
        .filter_map(|pair| {
            let lon = pair.get(0)?.as_f64()?;
            let lat = pair.get(1)?.as_f64()?;
            Some(GeoPoint::new(lat, lon))
        })
        .collect();

    Polygon::from_ring(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_place_json() -> &'static str {
        r#"{
            "display_name": "123 Example St, Seattle, WA",
            "lat": "47.6",
            "lon": "-122.3",
            "boundingbox": ["47.5995", "47.6005", "-122.3008", "-122.2992"],
            "geojson": {
                "type": "Polygon",
                "coordinates": [[
                    [-122.3005, 47.5997],
                    [-122.2995, 47.5997],
                    [-122.2995, 47.6003],
                    [-122.3005, 47.6003],
                    [-122.3005, 47.5997]
                ]]
            }
        }"#
    }

    #[test]
    fn test_normalize_place_reorders_bounding_box() {
        let raw: NominatimPlace = serde_json::from_str(sample_place_json()).unwrap();
        let result = normalize_place(raw).unwrap();
        assert_eq!(result.bbox.west, -122.3008);
        assert_eq!(result.bbox.south, 47.5995);
        assert_eq!(result.bbox.east, -122.2992);
        assert_eq!(result.bbox.north, 47.6005);
        assert!(result.bbox.contains(&result.center));
    }

    #[test]
    fn test_normalize_place_extracts_footprint() {
        let raw: NominatimPlace = serde_json::from_str(sample_place_json()).unwrap();
        let result = normalize_place(raw).unwrap();
        let footprint = result.footprint.unwrap();
        assert_eq!(footprint.ring().len(), 5);
        assert_eq!(footprint.ring()[0], GeoPoint::new(47.5997, -122.3005));
    }

    #[test]
    fn test_normalize_place_reduces_multipolygon() {
        let raw: NominatimPlace = serde_json::from_str(
            r#"{
                "display_name": "Complex Building",
                "lat": "47.6",
                "lon": "-122.3",
                "boundingbox": ["47.59", "47.61", "-122.31", "-122.29"],
                "geojson": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[-122.301, 47.599], [-122.299, 47.599], [-122.299, 47.601], [-122.301, 47.599]]],
                        [[[-122.31, 47.59], [-122.30, 47.59], [-122.30, 47.60], [-122.31, 47.59]]]
                    ]
                }
            }"#,
        )
        .unwrap();
        let footprint = normalize_place(raw).unwrap().footprint.unwrap();
        // First polygon's outer ring only.
        assert_eq!(footprint.ring()[0], GeoPoint::new(47.599, -122.301));
    }

    #[test]
    fn test_normalize_place_drops_point_geojson() {
        let raw: NominatimPlace = serde_json::from_str(
            r#"{
                "display_name": "A point feature",
                "lat": "47.6",
                "lon": "-122.3",
                "boundingbox": ["47.59", "47.61", "-122.31", "-122.29"],
                "geojson": {"type": "Point", "coordinates": [-122.3, 47.6]}
            }"#,
        )
        .unwrap();
        assert!(normalize_place(raw).unwrap().footprint.is_none());
    }

    #[test]
    fn test_normalize_place_rejects_unparseable_coordinates() {
        let raw: NominatimPlace = serde_json::from_str(
            r#"{
                "display_name": "Broken",
                "lat": "not-a-number",
                "lon": "-122.3",
                "boundingbox": ["47.59", "47.61", "-122.31", "-122.29"]
            }"#,
        )
        .unwrap();
        assert!(normalize_place(raw).is_none());
    }

    #[test]
    fn test_normalize_query_collapses_whitespace_and_case() {
        assert_eq!(normalize_query("  123  Example   St "), "123 example st");
        assert_eq!(
            normalize_query("123 Example St"),
            normalize_query("123 EXAMPLE ST")
        );
    }

    #[test]
    fn test_detail_cache_key_includes_near_hint() {
        let near = GeoPoint::new(47.6, -122.3);
        assert_ne!(
            detail_cache_key("cafe", Some(near)),
            detail_cache_key("cafe", None)
        );
    }

    #[test]
    fn test_create_client() {
        assert!(NominatimGeocoder::new().is_ok());
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        let config = NominatimConfig {
            api_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(NominatimGeocoder::with_config(config).is_err());
    }

    // Run with: cargo test -p doorstep-core test_nominatim_live -- --ignored
    #[tokio::test]
    #[ignore = "requires network access to the public geocoding API"]
    async fn test_nominatim_live() {
        let geocoder = NominatimGeocoder::new().unwrap();
        let result = geocoder
            .geocode("Space Needle, Seattle", None)
            .await
            .unwrap();
        assert!(result.is_some());
    }
}
