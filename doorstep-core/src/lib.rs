//! Doorstep Core - entrance resolution from public map data
//!
//! This crate locates the most plausible pedestrian entrance of a
//! building given only an address or place query, using a free geocoding
//! API and an Overpass-style OSM road/path index instead of any
//! proprietary entrance dataset.
//!
//! # Components
//!
//! - A pure geometry kernel (great-circle distance, polyline projection,
//!   centroids, boundary clamping)
//! - An external data gateway with courtesy rate limiting and
//!   read-through TTL caching toward both upstream services
//! - The heuristic resolver pipeline producing an entrance, a drop-off
//!   point, and a confidence tier
//! - An append-only correction/confirmation store that lets verified
//!   human feedback permanently override the heuristic
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use doorstep_core::{
//!     EntranceResolver, MemoryFeedbackStore, NominatimGeocoder, OverpassClient,
//! };
//!
//! # async fn example() -> doorstep_core::Result<()> {
//! let resolver = EntranceResolver::new(
//!     Arc::new(NominatimGeocoder::new()?),
//!     Arc::new(OverpassClient::new()?),
//!     Arc::new(MemoryFeedbackStore::new()),
//! );
//!
//! let response = resolver.resolve("123 Example St, Seattle", None).await?;
//! println!(
//!     "{}: entrance at ({:.5}, {:.5}), confidence {}",
//!     response.name, response.entrance.lat, response.entrance.lon,
//!     response.entrance.confidence,
//! );
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod feedback;
pub mod geometry;
pub mod place;

#[cfg(feature = "network")]
pub mod gateway;
#[cfg(feature = "network")]
pub mod resolver;

// Re-export main types for convenience
pub use error::{DoorstepError, Result};
pub use feedback::{Confirmation, ConfirmationStats, Correction, MemoryFeedbackStore};
pub use place::{
    BoundingBox, Confidence, EntranceEstimate, GeoPoint, GeocodeResult, PlaceId, Polygon,
    ResolutionMethod,
};

#[cfg(feature = "network")]
pub use feedback::FeedbackStore;
#[cfg(feature = "network")]
pub use gateway::{
    GeocodingProvider, NominatimConfig, NominatimGeocoder, OverpassClient, OverpassConfig,
    PathNetwork, PathNetworkProvider, PathSegment, StaticGeocoder, StaticPathNetwork,
};
#[cfg(feature = "network")]
pub use resolver::{
    DropoffPoint, EntranceResolver, EntranceResponse, ResolvedEntrance, ResolverConfig,
};
