//! Service metadata routes.
//!
//! GET /health                        - Liveness
//! GET /api/maps/readiness            - Map script readiness for the checkout page
//! GET /api/schema/order-submission   - JSON schema of the gateway payload

use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::{json, Value};

use crate::maps::MapReadiness;
use crate::models::OrderSubmission;
use crate::state::SharedState;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/maps/readiness", get(maps_readiness))
        .route("/api/schema/order-submission", get(order_submission_schema))
}

async fn health(Extension(state): Extension<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "open_sessions": state.sessions.len(),
    }))
}

async fn maps_readiness(Extension(state): Extension<SharedState>) -> Json<MapReadiness> {
    Json(state.maps.readiness().await)
}

async fn order_submission_schema() -> Json<schemars::schema::RootSchema> {
    Json(schemars::schema_for!(OrderSubmission))
}
