//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3.0 specification for the Doorstep API.

use utoipa::OpenApi;

use crate::handlers::{
    ConfirmationRequest, ConfirmationResponse, CorrectionRequest, CorrectionResponse,
    HealthResponse, ReadyResponse, SuggestCandidate, SuggestResponse,
};

/// Doorstep API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Doorstep API",
        version = "0.1.0",
        description = r#"
## Pedestrian Entrance Resolution API

Doorstep locates the most plausible pedestrian entrance of a building
given only an address or place query, using public map data:

- **Geocoding** via a Nominatim-style search API
- **Road/path geometry** via an Overpass-style OSM query API
- **Heuristic fusion** producing an entrance point, a drop-off point,
  and a confidence tier
- **Human feedback** - verified corrections permanently override the
  heuristic for a place; confirmations accumulate as social proof

### How It Works

1. `GET /entrance?q=...` resolves a query to an entrance estimate
2. The `method` field records which heuristic tier produced it
3. `POST /feedback/correction` relocates an entrance (becomes ground truth)
4. `POST /feedback/confirmation` affirms the shown entrance

Both upstream services are free community infrastructure; the server
applies courtesy rate limits and caching toward them on every request.
"#,
        license(
            name = "MIT OR Apache-2.0",
            url = "https://github.com/doorstep-maps/doorstep/blob/main/LICENSE"
        )
    ),
    paths(
        crate::handlers::entrance::entrance_handler,
        crate::handlers::entrance::suggest_handler,
        crate::handlers::feedback::correction_handler,
        crate::handlers::feedback::confirmation_handler,
        crate::handlers::health::health,
        crate::handlers::health::ready,
    ),
    components(schemas(
        SuggestCandidate,
        SuggestResponse,
        CorrectionRequest,
        CorrectionResponse,
        ConfirmationRequest,
        ConfirmationResponse,
        HealthResponse,
        ReadyResponse,
    )),
    tags(
        (name = "Resolution", description = "Entrance resolution and geocoder suggestions"),
        (name = "Feedback", description = "Corrections and confirmations"),
        (name = "Monitoring", description = "Health and readiness probes")
    )
)]
pub struct ApiDoc;
