//! CLI command implementations.

pub mod resolve;
pub mod suggest;

use std::sync::Arc;

use anyhow::{Context, Result};

use doorstep_core::{
    EntranceResolver, GeoPoint, MemoryFeedbackStore, NominatimGeocoder, OverpassClient,
};

/// Build a resolver over the live public services.
///
/// The CLI has no durable feedback log; corrections recorded by the
/// server do not apply here.
pub(crate) fn build_resolver() -> Result<EntranceResolver> {
    Ok(EntranceResolver::new(
        Arc::new(NominatimGeocoder::new().context("creating geocoding client")?),
        Arc::new(OverpassClient::new().context("creating road/path client")?),
        Arc::new(MemoryFeedbackStore::new()),
    ))
}

/// Parse a `LAT,LON` argument.
pub(crate) fn parse_near(value: &str) -> Result<GeoPoint> {
    let (lat, lon) = value
        .split_once(',')
        .with_context(|| format!("expected LAT,LON, got \"{value}\""))?;
    let point = GeoPoint::new(
        lat.trim().parse().context("latitude is not a number")?,
        lon.trim().parse().context("longitude is not a number")?,
    );
    anyhow::ensure!(point.is_valid(), "coordinate {point} out of WGS84 range");
    Ok(point)
}
