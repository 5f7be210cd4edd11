//! Doorstep Server - REST API for entrance resolution
//!
//! Wires the resolution engine to live upstream clients and serves the
//! inbound query surface:
//! - GET  /entrance              - resolve an entrance for a place query
//! - GET  /suggest               - ranked geocoder candidates
//! - POST /feedback/correction   - relocate an entrance (ground truth)
//! - POST /feedback/confirmation - affirm the shown entrance

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use doorstep_core::{
    EntranceResolver, NominatimConfig, NominatimGeocoder, OverpassClient, OverpassConfig,
};
use doorstep_server::{create_router_with_config, feedback_store_from_env, AppState, Config};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("doorstep_server=info,doorstep_core=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    let geocoder = match NominatimGeocoder::with_config(NominatimConfig {
        user_agent: config.user_agent.clone(),
        ..Default::default()
    }) {
        Ok(geocoder) => Arc::new(geocoder),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create geocoding client");
            std::process::exit(1);
        }
    };

    let path_network = match OverpassClient::with_config(OverpassConfig {
        user_agent: config.user_agent.clone(),
        ..Default::default()
    }) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create road/path client");
            std::process::exit(1);
        }
    };

    let feedback = match feedback_store_from_env(config.database_max_connections).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize feedback storage");
            std::process::exit(1);
        }
    };

    let resolver = Arc::new(EntranceResolver::new(
        geocoder,
        path_network,
        feedback.clone(),
    ));
    let state = AppState::new(resolver, feedback);

    let app = create_router_with_config(&config, state);
    let addr = config.socket_addr();

    tracing::info!(%addr, "doorstep-server listening");
    tracing::info!("API docs at http://{addr}/api-docs");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");
    axum::serve(listener, app)
        .await
        .expect("Server error");
}
