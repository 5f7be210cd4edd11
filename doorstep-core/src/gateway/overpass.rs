//! Overpass-style road and path query client.
//!
//! The public interpreter explicitly asks for at most one request per
//! second; the bucket here (capacity 1, refill one per 2 s) keeps
//! meaningful headroom below that. Refusals and upstream failures never
//! surface as errors: the client degrades to the last cached result for
//! the box, stale or not, and finally to an empty network; the
//! resolver's fallback tier absorbs the rest.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::cache::TtlCache;
use super::http::{UpstreamClient, UpstreamConfig};
use super::limiter::TokenBucket;
use super::{PathNetwork, PathNetworkProvider, PathSegment};
use crate::error::{DoorstepError, Result};
use crate::place::{BoundingBox, GeoPoint};

/// Default public endpoint.
const DEFAULT_API_URL: &str = "https://overpass-api.de/api/interpreter";

/// Courtesy bucket toward the interpreter: no burst, sustained 1 per 2 s.
const BUCKET_CAPACITY: f64 = 1.0;
const BUCKET_REFILL_PER_SEC: f64 = 0.5;

/// Road geometry changes slowly; cache generously.
const NETWORK_TTL: Duration = Duration::from_secs(600);

/// Server-side timeout hint embedded in the query, in seconds.
const QUERY_TIMEOUT_SECS: u64 = 10;

/// Geohash precision for the cache key; precision 8 is a cell of roughly
/// 38 m x 19 m, comfortably below the search boxes this client sees.
const CACHE_KEY_GEOHASH_PRECISION: usize = 8;

/// Highway values treated as walkable.
const WALKWAY_HIGHWAY_TAGS: &[&str] = &["footway", "path", "sidewalk"];

/// Highway values treated as drivable.
const ROADWAY_HIGHWAY_TAGS: &[&str] = &[
    "residential",
    "tertiary",
    "secondary",
    "primary",
    "service",
    "living_street",
];

/// Configuration for the road/path client.
#[derive(Debug, Clone)]
pub struct OverpassConfig {
    /// Interpreter endpoint URL.
    pub api_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for transient errors.
    pub max_retries: u32,
    /// Identifying User-Agent sent with every request.
    pub user_agent: String,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        let upstream = UpstreamConfig::default();
        Self {
            api_url: std::env::var("OVERPASS_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            timeout: upstream.timeout,
            max_retries: upstream.max_retries,
            user_agent: upstream.user_agent,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    id: u64,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    geometry: Vec<OverpassVertex>,
}

#[derive(Debug, Deserialize)]
struct OverpassVertex {
    lat: f64,
    lon: f64,
}

enum PathClass {
    Walkway,
    Roadway,
}

/// Road/path query client for an Overpass-style API.
pub struct OverpassClient {
    client: UpstreamClient,
    base_url: Url,
    bucket: TokenBucket,
    cache: TtlCache<String, PathNetwork>,
}

impl OverpassClient {
    /// Create a client with default settings (env-overridable endpoint).
    pub fn new() -> Result<Self> {
        Self::with_config(OverpassConfig::default())
    }

    pub fn with_config(config: OverpassConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| DoorstepError::InvalidInput(format!("bad interpreter URL: {e}")))?;
        let client = UpstreamClient::new(UpstreamConfig {
            timeout: config.timeout,
            max_retries: config.max_retries,
            user_agent: config.user_agent,
        })?;
        Ok(Self {
            client,
            base_url,
            bucket: TokenBucket::new(BUCKET_CAPACITY, BUCKET_REFILL_PER_SEC),
            cache: TtlCache::new(NETWORK_TTL),
        })
    }

    /// Serve the best degraded answer for `key`: the last cached network
    /// for the box if one exists, else nothing at all.
    fn degraded(&self, key: &str) -> PathNetwork {
        self.cache.get_stale(&key.to_string()).unwrap_or_default()
    }
}

#[async_trait]
impl PathNetworkProvider for OverpassClient {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, bbox: &BoundingBox) -> Result<PathNetwork> {
        let key = cache_key(bbox);
        if let Some(hit) = self.cache.get(&key) {
            debug!("road network cache hit");
            return Ok(hit);
        }
        if !self.bucket.try_take("interpreter") {
            debug!("road network bucket empty, serving degraded data");
            return Ok(self.degraded(&key));
        }

        let query = build_query(bbox);
        match self
            .client
            .post_form_json::<OverpassResponse>("interpreter", self.base_url.clone(), &[("data", query)])
            .await
        {
            Ok(raw) => {
                let network = classify_elements(raw.elements);
                self.cache.insert(key, network.clone());
                Ok(network)
            }
            Err(err) => {
                warn!(error = %err, "road network fetch failed, serving degraded data");
                Ok(self.degraded(&key))
            }
        }
    }
}

/// OverpassQL for every highway-tagged way in the box, with geometry.
fn build_query(bbox: &BoundingBox) -> String {
    format!(
        "[out:json][timeout:{}];way[\"highway\"]({:.7},{:.7},{:.7},{:.7});out geom;",
        QUERY_TIMEOUT_SECS, bbox.south, bbox.west, bbox.north, bbox.east
    )
}

/// Cache key from the rounded box: geohash of the center plus the box
/// span, so identical and near-identical boxes share an entry.
fn cache_key(bbox: &BoundingBox) -> String {
    let center = bbox.center();
    let cell = geohash::encode(
        geohash::Coord {
            x: center.lon,
            y: center.lat,
        },
        CACHE_KEY_GEOHASH_PRECISION,
    )
    .unwrap_or_else(|_| format!("{:.4},{:.4}", center.lat, center.lon));
    format!(
        "{}/{:.4}x{:.4}",
        cell,
        bbox.east - bbox.west,
        bbox.north - bbox.south
    )
}

fn classify(tags: &HashMap<String, String>) -> Option<PathClass> {
    if let Some(highway) = tags.get("highway") {
        if WALKWAY_HIGHWAY_TAGS.contains(&highway.as_str()) {
            return Some(PathClass::Walkway);
        }
        if ROADWAY_HIGHWAY_TAGS.contains(&highway.as_str()) {
            return Some(PathClass::Roadway);
        }
    }
    // Separately mapped sidewalks carry footway=sidewalk.
    if tags.get("footway").map(String::as_str) == Some("sidewalk") {
        return Some(PathClass::Walkway);
    }
    None
}

/// Split raw elements into walkways and roadways; unmatched tags and
/// geometry-less elements are dropped.
fn classify_elements(elements: Vec<OverpassElement>) -> PathNetwork {
    let mut network = PathNetwork::default();
    for element in elements {
        if element.geometry.is_empty() {
            continue;
        }
        let Some(class) = classify(&element.tags) else {
            continue;
        };
        let segment = PathSegment {
            id: element.id,
            points: element
                .geometry
                .into_iter()
                .map(|v| GeoPoint::new(v.lat, v.lon))
                .collect(),
        };
        match class {
            PathClass::Walkway => network.walkways.push(segment),
            PathClass::Roadway => network.roadways.push(segment),
        }
    }
    network
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_classify_walkways() {
        assert!(matches!(
            classify(&tags(&[("highway", "footway")])),
            Some(PathClass::Walkway)
        ));
        assert!(matches!(
            classify(&tags(&[("highway", "path")])),
            Some(PathClass::Walkway)
        ));
        assert!(matches!(
            classify(&tags(&[("highway", "footway"), ("footway", "sidewalk")])),
            Some(PathClass::Walkway)
        ));
        assert!(matches!(
            classify(&tags(&[("footway", "sidewalk")])),
            Some(PathClass::Walkway)
        ));
    }

    #[test]
    fn test_classify_roadways() {
        for value in ROADWAY_HIGHWAY_TAGS.iter().copied() {
            assert!(
                matches!(
                    classify(&tags(&[("highway", value)])),
                    Some(PathClass::Roadway)
                ),
                "highway={value} should be drivable"
            );
        }
    }

    #[test]
    fn test_classify_drops_unmatched_tags() {
        assert!(classify(&tags(&[("highway", "motorway")])).is_none());
        assert!(classify(&tags(&[("highway", "cycleway")])).is_none());
        assert!(classify(&tags(&[("building", "yes")])).is_none());
        assert!(classify(&HashMap::new()).is_none());
    }

    #[test]
    fn test_classify_elements_splits_and_drops() {
        let json = r#"{
            "elements": [
                {
                    "id": 1,
                    "tags": {"highway": "footway"},
                    "geometry": [{"lat": 47.6, "lon": -122.3}, {"lat": 47.601, "lon": -122.3}]
                },
                {
                    "id": 2,
                    "tags": {"highway": "residential"},
                    "geometry": [{"lat": 47.6, "lon": -122.31}, {"lat": 47.6, "lon": -122.29}]
                },
                {
                    "id": 3,
                    "tags": {"highway": "motorway"},
                    "geometry": [{"lat": 47.6, "lon": -122.3}]
                },
                {
                    "id": 4,
                    "tags": {"highway": "footway"},
                    "geometry": []
                }
            ]
        }"#;
        let response: OverpassResponse = serde_json::from_str(json).unwrap();
        let network = classify_elements(response.elements);
        assert_eq!(network.walkways.len(), 1);
        assert_eq!(network.walkways[0].id, 1);
        assert_eq!(network.roadways.len(), 1);
        assert_eq!(network.roadways[0].id, 2);
    }

    #[test]
    fn test_build_query_embeds_box_and_timeout() {
        let bbox = BoundingBox::new(-122.31, 47.59, -122.29, 47.61);
        let query = build_query(&bbox);
        assert!(query.starts_with("[out:json][timeout:10];"));
        assert!(query.contains("47.5900000,-122.3100000,47.6100000,-122.2900000"));
        assert!(query.ends_with("out geom;"));
    }

    #[test]
    fn test_cache_key_stable_for_identical_boxes() {
        let a = BoundingBox::new(-122.31, 47.59, -122.29, 47.61);
        let b = BoundingBox::new(-122.31, 47.59, -122.29, 47.61);
        assert_eq!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn test_cache_key_differs_across_town() {
        let a = BoundingBox::new(-122.31, 47.59, -122.29, 47.61);
        let b = BoundingBox::new(-122.41, 47.69, -122.39, 47.71);
        assert_ne!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn test_create_client() {
        assert!(OverpassClient::new().is_ok());
    }

    // Run with: cargo test -p doorstep-core test_overpass_live -- --ignored
    #[tokio::test]
    #[ignore = "requires network access to the public interpreter"]
    async fn test_overpass_live() {
        let client = OverpassClient::new().unwrap();
        let bbox = BoundingBox::new(-122.3418, 47.6195, -122.3398, 47.6215);
        let network = client.fetch(&bbox).await.unwrap();
        assert!(!network.walkways.is_empty() || !network.roadways.is_empty());
    }
}
