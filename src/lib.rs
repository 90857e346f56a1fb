//! # EasyDrop Checkout Service Library
//!
//! Exposes the Axum router and modules so integration tests can create
//! an in-process server against a mock gateway and geocoder.

pub mod config;
pub mod error;
pub mod form;
pub mod gateway;
pub mod geocoding;
pub mod intent;
pub mod maps;
pub mod models;
pub mod redirect;
pub mod routes;
pub mod session;
pub mod state;

use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

/// Build the Axum router with all route modules and middleware.
///
/// This function does NOT bind a listener.
pub fn create_app(state: SharedState) -> Router {
    Router::new()
        .merge(routes::meta::router())
        .merge(routes::sessions::router())
        .merge(routes::location::router())
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
