//! External data gateway.
//!
//! Two free upstream dependencies feed the resolver: a geocoding API and
//! an Overpass-style road/path query API. Each live client wraps its
//! dependency in a courtesy token bucket and a read-through TTL cache;
//! a cache hit never consumes a token. Provider-specific response shapes
//! are normalized into the crate's value types right here at the
//! boundary.
//!
//! The [`GeocodingProvider`] and [`PathNetworkProvider`] traits are the
//! seams: the resolver only ever sees the traits, so tests and offline
//! callers substitute the deterministic [`StaticGeocoder`] and
//! [`StaticPathNetwork`] fixtures.

mod cache;
mod http;
mod limiter;
mod mock;
mod nominatim;
mod overpass;

pub use cache::TtlCache;
pub use http::{UpstreamClient, UpstreamConfig};
pub use limiter::TokenBucket;
pub use mock::{StaticGeocoder, StaticPathNetwork};
pub use nominatim::{NominatimConfig, NominatimGeocoder};
pub use overpass::{OverpassClient, OverpassConfig};

use async_trait::async_trait;

use crate::error::Result;
use crate::place::{BoundingBox, GeoPoint, GeocodeResult};

/// One polyline from the road/path index.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    /// Upstream element id, carried through to the response overlay.
    pub id: u64,
    pub points: Vec<GeoPoint>,
}

/// Road/path context for one search box, classified at the gateway.
///
/// Derived per query and never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathNetwork {
    /// Walkable ways (footway/path/sidewalk).
    pub walkways: Vec<PathSegment>,
    /// Drivable ways (residential through service roads).
    pub roadways: Vec<PathSegment>,
}

impl PathNetwork {
    pub fn is_empty(&self) -> bool {
        self.walkways.is_empty() && self.roadways.is_empty()
    }
}

/// A source of geocoded places.
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// Ranked candidates for an incomplete query; no polygon geometry.
    async fn suggest(&self, query: &str) -> Result<Vec<GeocodeResult>>;

    /// Best single candidate with polygon geometry, optionally biased
    /// toward `near`. `Ok(None)` means the query matched nothing.
    async fn geocode(&self, query: &str, near: Option<GeoPoint>) -> Result<Option<GeocodeResult>>;
}

/// A source of road/path geometry for a bounding box.
#[async_trait]
pub trait PathNetworkProvider: Send + Sync {
    async fn fetch(&self, bbox: &BoundingBox) -> Result<PathNetwork>;
}
