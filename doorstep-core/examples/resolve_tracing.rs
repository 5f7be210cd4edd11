//! Example demonstrating resolver tracing instrumentation.
//!
//! Run with: cargo run -p doorstep-core --example resolve_tracing -- "Space Needle, Seattle"

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use doorstep_core::{EntranceResolver, MemoryFeedbackStore, NominatimGeocoder, OverpassClient};

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber with debug level
    fmt()
        .with_env_filter(EnvFilter::new("doorstep_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Space Needle, Seattle".to_string());

    println!("=== Doorstep Resolution Tracing Demo ===\n");
    println!("Query: {query}\n");

    let geocoder = match NominatimGeocoder::new() {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Failed to create geocoding client: {e}");
            return;
        }
    };
    let paths = match OverpassClient::new() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to create road/path client: {e}");
            return;
        }
    };

    let resolver = EntranceResolver::new(
        Arc::new(geocoder),
        Arc::new(paths),
        Arc::new(MemoryFeedbackStore::new()),
    );

    println!("\nResolving...\n");

    match resolver.resolve(&query, None).await {
        Ok(response) => {
            println!("\n✅ {}", response.name);
            println!(
                "   Entrance: ({:.5}, {:.5})",
                response.entrance.lat, response.entrance.lon
            );
            println!("   Method:   {}", response.method);
            println!("   Confidence: {}", response.entrance.confidence);
            if let Some(dropoff) = response.dropoff {
                println!("   Dropoff:  ({:.5}, {:.5})", dropoff.lat, dropoff.lon);
            }
        }
        Err(e) => {
            println!("\n❌ Failed: {e}");
        }
    }
}
