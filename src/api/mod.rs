//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer/start-pause", post(start_pause_handler))
        .route("/timer/reset", post(reset_handler))
        .route("/timer/duration", post(duration_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .route("/gallery", get(gallery_handler))
        .route("/background", get(background_handler))
        .route("/background/data", get(background_data_handler))
        .route("/background/gallery", post(select_gallery_handler))
        .route("/background/upload", post(upload_handler))
        .route("/background/generate", post(generate_handler))
        .route("/preferences", get(preferences_handler).put(set_preferences_handler))
        .route("/fullscreen", put(fullscreen_set_handler))
        .route("/fullscreen/toggle", post(fullscreen_toggle_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
