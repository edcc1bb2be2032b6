//! Route handlers.

use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use atlas_core::boundary::BoundaryType;
use atlas_core::Timestamp;
use atlas_crypto::field::fr_to_hex;
use atlas_lookup::{LookupBundle, LookupRequest};

use crate::error::AppError;
use crate::state::AppState;

/// Query parameters for district resolution.
#[derive(Debug, Deserialize)]
pub struct DistrictsQuery {
    pub lat: f64,
    pub lng: f64,
    /// Optional layer restriction by canonical name.
    pub layer: Option<BoundaryType>,
}

/// District resolution response: the lookup bundle plus serving stats.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictsResponse {
    #[serde(flatten)]
    pub bundle: LookupBundle,
    pub latency_ms: u64,
    pub cache_hit: bool,
}

/// `GET /v1/districts?lat=<f>&lng=<f>`
pub async fn districts(
    State(state): State<AppState>,
    Query(query): Query<DistrictsQuery>,
) -> Result<Json<DistrictsResponse>, AppError> {
    let started = Instant::now();
    let bundle = state.coordinator.locate(LookupRequest {
        lat: query.lat,
        lon: query.lng,
        layer: query.layer,
        deadline: Some(started + state.lookup_timeout),
    })?;
    Ok(Json(DistrictsResponse {
        bundle,
        latency_ms: started.elapsed().as_millis() as u64,
        cache_hit: false,
    }))
}

/// Current snapshot metadata, without the leaf table.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub snapshot_id: String,
    pub depth: u8,
    pub root: String,
    pub boundary_count: u32,
    pub layer_counts: std::collections::BTreeMap<String, u32>,
    pub generated_at: Timestamp,
    pub tiger_version: String,
    pub blob_cid: String,
}

/// `GET /v1/snapshot`
pub async fn snapshot(State(state): State<AppState>) -> Result<Json<SnapshotResponse>, AppError> {
    let Some(atlas) = state.coordinator.current() else {
        return Err(AppError::NotFound("no snapshot published".to_string()));
    };
    let snapshot = atlas.snapshot();
    Ok(Json(SnapshotResponse {
        snapshot_id: snapshot.snapshot_id().to_string(),
        depth: snapshot.depth().as_u8(),
        root: fr_to_hex(&snapshot.merkle_root()),
        boundary_count: snapshot.boundary_count(),
        layer_counts: snapshot.layer_counts().clone(),
        generated_at: snapshot.metadata().generated_at,
        tiger_version: snapshot.metadata().tiger_version.clone(),
        blob_cid: atlas.cid().to_string(),
    }))
}

/// `GET /v1/health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub environment: String,
    pub version: &'static str,
    pub timestamp: Timestamp,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        environment: state.environment.clone(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Timestamp::now(),
    })
}
