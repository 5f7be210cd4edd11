//! Deterministic provider fixtures for tests and offline use.
//!
//! These stand in for the live upstream clients with pre-seeded data and
//! call counters, so pipeline behavior can be pinned without a network.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{GeocodingProvider, PathNetwork, PathNetworkProvider};
use crate::error::{DoorstepError, Result};
use crate::place::{GeoPoint, GeocodeResult};

/// Geocoding provider that always answers from a fixed candidate list.
#[derive(Default)]
pub struct StaticGeocoder {
    results: Vec<GeocodeResult>,
    calls: AtomicUsize,
}

impl StaticGeocoder {
    pub fn new(results: Vec<GeocodeResult>) -> Self {
        Self {
            results,
            calls: AtomicUsize::new(0),
        }
    }

    /// A geocoder that never matches anything.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of times either provider method has been invoked.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeocodingProvider for StaticGeocoder {
    async fn suggest(&self, _query: &str) -> Result<Vec<GeocodeResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.clone())
    }

    async fn geocode(&self, _query: &str, _near: Option<GeoPoint>) -> Result<Option<GeocodeResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.first().cloned())
    }
}

/// Path network provider that serves a fixed network, or fails every
/// request to exercise degraded paths.
#[derive(Default)]
pub struct StaticPathNetwork {
    network: PathNetwork,
    fail: bool,
    calls: AtomicUsize,
}

impl StaticPathNetwork {
    pub fn new(network: PathNetwork) -> Self {
        Self {
            network,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider with no paths or roads at all.
    pub fn empty() -> Self {
        Self::new(PathNetwork::default())
    }

    /// A provider whose every fetch fails as if the upstream were down.
    pub fn failing() -> Self {
        Self {
            network: PathNetwork::default(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times `fetch` has been invoked.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PathNetworkProvider for StaticPathNetwork {
    async fn fetch(&self, _bbox: &crate::place::BoundingBox) -> Result<PathNetwork> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DoorstepError::Upstream {
                service: "interpreter",
                reason: "simulated outage".to_string(),
            });
        }
        Ok(self.network.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::BoundingBox;

    #[tokio::test]
    async fn test_static_geocoder_counts_calls() {
        let geocoder = StaticGeocoder::empty();
        assert!(geocoder.geocode("anything", None).await.unwrap().is_none());
        assert!(geocoder.suggest("anything").await.unwrap().is_empty());
        assert_eq!(geocoder.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_path_network() {
        let provider = StaticPathNetwork::failing();
        let bbox = BoundingBox::new(-122.31, 47.59, -122.29, 47.61);
        assert!(provider.fetch(&bbox).await.is_err());
        assert_eq!(provider.call_count(), 1);
    }
}
