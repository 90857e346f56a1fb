//! Delivery location routes.
//!
//! POST /api/sessions/{id}/location/pin    - Map click or marker drag
//! POST /api/sessions/{id}/location/search - Address search
//!
//! Geocoding runs without holding the session lock, so two gestures in quick
//! succession produce two in-flight requests. By default the last one to
//! complete wins; with `discard_stale_geocodes` only the newest gesture may
//! update the form.

use axum::extract::Path;
use axum::routing::post;
use axum::{Extension, Json, Router};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::form::LocationUpdate;
use crate::models::{ApiResponse, LocationResponse, PinRequest, SearchRequest};
use crate::routes::sessions::find_session;
use crate::session::CheckoutSession;
use crate::state::SharedState;

pub fn router() -> Router {
    Router::new()
        .route("/api/sessions/{id}/location/pin", post(drop_pin))
        .route("/api/sessions/{id}/location/search", post(search_address))
}

/// Reverse geocode the pin and move the delivery point there.
///
/// When no address is found the coordinates stay as they were and the
/// address is replaced by the not-found sentinel.
async fn drop_pin(
    Extension(state): Extension<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PinRequest>,
) -> Result<Json<ApiResponse<LocationResponse>>, AppError> {
    let session = find_session(&state, id)?;
    let ticket = session.lock().begin_geocode();

    let result = state.geocoder.reverse(req.latitude, req.longitude).await;

    let mut session = session.lock();
    if is_stale(&state, &session, ticket) {
        return Ok(dropped(&session));
    }

    let message = match result {
        Ok(place) => {
            session.form.apply_location(LocationUpdate {
                latitude: req.latitude,
                longitude: req.longitude,
                address: place.address,
                postal_code: place.postal_code,
            });
            "Location updated"
        }
        Err(e) => {
            warn!(
                "Reverse geocoding {},{} failed: {}",
                req.latitude, req.longitude, e
            );
            session.form.mark_address_not_found();
            "Address not found"
        }
    };

    Ok(Json(ApiResponse {
        data: LocationResponse {
            location: session.form.location().clone(),
            applied: true,
        },
        message: message.to_string(),
    }))
}

/// Forward geocode a free-text query. A failed search leaves the form as it is.
async fn search_address(
    Extension(state): Extension<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<ApiResponse<LocationResponse>>, AppError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("Search query is required".to_string()));
    }

    let session = find_session(&state, id)?;
    let ticket = session.lock().begin_geocode();

    let place = state.geocoder.forward(query).await.inspect_err(|e| {
        warn!("Address search {:?} failed: {}", query, e);
    })?;

    let mut session = session.lock();
    if is_stale(&state, &session, ticket) {
        return Ok(dropped(&session));
    }

    session.form.apply_location(LocationUpdate {
        latitude: place.latitude,
        longitude: place.longitude,
        address: place.address,
        postal_code: place.postal_code,
    });

    Ok(Json(ApiResponse {
        data: LocationResponse {
            location: session.form.location().clone(),
            applied: true,
        },
        message: "Location updated".to_string(),
    }))
}

fn is_stale(state: &SharedState, session: &CheckoutSession, ticket: u64) -> bool {
    let stale = state.config.discard_stale_geocodes && !session.is_latest_geocode(ticket);
    if stale {
        debug!("Dropping geocoding result {} for session {}", ticket, session.id);
    }
    stale
}

fn dropped(session: &CheckoutSession) -> Json<ApiResponse<LocationResponse>> {
    Json(ApiResponse {
        data: LocationResponse {
            location: session.form.location().clone(),
            applied: false,
        },
        message: "Superseded by a newer location request".to_string(),
    })
}
