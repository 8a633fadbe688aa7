//! Defines the routes of the ingestion service.
//!
//! ## Structure
//! - `POST /api/upload`: multipart upload, answers `{ "link": "<url>" }`
//! - `GET  /healthz`: liveness
//! - `GET  /readyz`: readiness (storage configuration)

use crate::{
    AppState,
    handlers::{
        health_handlers::{healthz, readyz},
        upload_handlers::upload_file,
    },
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all endpoints.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/upload", post(upload_file))
}
