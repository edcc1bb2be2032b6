//! # atlas-api — The Lookup HTTP Surface
//!
//! A thin Axum layer over [`atlas_lookup::LookupCoordinator`]. Three
//! routes:
//!
//! - `GET /v1/districts?lat=<f>&lng=<f>` — resolve a coordinate to a
//!   district with its inclusion proof and provenance.
//! - `GET /v1/snapshot` — current snapshot metadata, no leaf table.
//! - `GET /v1/health` — service health.
//!
//! No business logic lives in handlers: they validate the query shape,
//! delegate to the coordinator, and map typed failures onto status
//! codes (400 coordinate validation, 404 no district, 429 rate limited
//! upstream, 500 internal). Rate limiting itself runs at the edge in
//! front of this service; the mapping exists so its rejections stay
//! uniform with ours.

pub mod error;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::AppState;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/v1/districts", get(routes::districts))
        .route("/v1/snapshot", get(routes::snapshot))
        .route("/v1/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
