//! Media ingestion service.
//!
//! Accepts a single uploaded file over HTTP, stores it in an S3-compatible
//! bucket under a collision-resistant key with a public-read policy, and
//! returns the public URL of the stored object.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

use axum::{Router, extract::DefaultBodyLimit};
use services::{key_service::KeyGenerator, storage_service::StoreSlot};
use tower_http::trace::TraceLayer;

/// Shared, read-only state handed to every request.
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: StoreSlot,
    pub keys: KeyGenerator,
}

impl AppState {
    pub fn new(store: StoreSlot, keys: KeyGenerator) -> Self {
        Self { store, keys }
    }
}

/// Full application router with request tracing and the upload size limit.
pub fn build_app(state: AppState, max_upload_bytes: usize) -> Router {
    routes::routes::routes()
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
