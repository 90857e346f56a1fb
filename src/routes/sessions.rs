//! Checkout session routes.
//!
//! POST   /api/sessions               - Open a session from a partner checkout URL
//! GET    /api/sessions/{id}          - Retrieve the session and its order draft
//! DELETE /api/sessions/{id}          - Close the session (customer navigated away)
//! PATCH  /api/sessions/{id}/fields   - Apply direct user input
//! POST   /api/sessions/{id}/validate - Validate the draft
//! POST   /api/sessions/{id}/submit   - Submit the order to the gateway

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::form::ValidationReport;
use crate::models::{
    ApiResponse, CreateSessionRequest, FieldEdit, OrderDraft, SessionResponse, SubmitResponse,
};
use crate::redirect::{callback_redirect, DeliveryOutcome};
use crate::session::SessionHandle;
use crate::state::{AppState, SharedState};

/// Build the sessions router.
pub fn router() -> Router {
    Router::new()
        .route("/api/sessions", post(open_session))
        .route("/api/sessions/{id}", get(get_session).delete(close_session))
        .route("/api/sessions/{id}/fields", patch(edit_fields))
        .route("/api/sessions/{id}/validate", post(validate_session))
        .route("/api/sessions/{id}/submit", post(submit_order))
}

pub(crate) fn find_session(state: &AppState, id: Uuid) -> Result<SessionHandle, AppError> {
    state.sessions.get(id).ok_or(AppError::SessionNotFound(id))
}

/// Decode the partner URL and open a session pre-filled with its parcel.
///
/// A link that does not decode yields the `invalid_checkout_link` state
/// instead of a session.
async fn open_session(
    Extension(state): Extension<SharedState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), AppError> {
    let intent = crate::intent::decode(&req.url).inspect_err(|e| {
        warn!("Rejected checkout link: {}", e);
    })?;

    info!(
        "Checkout opened for {} ({} parcel)",
        intent.business_name, intent.parcel_size
    );

    let snapshot = state.sessions.open(intent).lock().snapshot();

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: snapshot,
            message: "Checkout session opened".to_string(),
        }),
    ))
}

async fn get_session(
    Extension(state): Extension<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionResponse>>, AppError> {
    let snapshot = find_session(&state, id)?.lock().snapshot();
    Ok(Json(ApiResponse {
        data: snapshot,
        message: "Checkout session retrieved".to_string(),
    }))
}

async fn close_session(
    Extension(state): Extension<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.close(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::SessionNotFound(id))
    }
}

async fn edit_fields(
    Extension(state): Extension<SharedState>,
    Path(id): Path<Uuid>,
    Json(edit): Json<FieldEdit>,
) -> Result<Json<ApiResponse<OrderDraft>>, AppError> {
    let session = find_session(&state, id)?;
    let mut session = session.lock();
    session.form.apply_edit(edit);

    Ok(Json(ApiResponse {
        data: session.form.draft().clone(),
        message: "Fields updated".to_string(),
    }))
}

async fn validate_session(
    Extension(state): Extension<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ValidationReport>, AppError> {
    let report = ValidationReport::from(find_session(&state, id)?.lock().form.validate());
    Ok(Json(report))
}

/// Validate the draft and submit it to the gateway.
///
/// 1. Reject invalid drafts with per-field messages (session stays editable)
/// 2. Set the busy flag; a second submit while busy is a conflict
/// 3. Send the normalized order once, on a task that closing the session aborts
/// 4. The task clears the busy flag when the gateway answers and closes the
///    session if the order was accepted, even if this request is gone by then
/// 5. Return the partner callback URL with the delivery outcome
async fn submit_order(
    Extension(state): Extension<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SubmitResponse>>, AppError> {
    let session = find_session(&state, id)?;

    let (task, callback_url) = {
        let mut guard = session.lock();
        let order = guard
            .form
            .validate()
            .map_err(|errors| AppError::Validation(ValidationReport::invalid(errors)))?;
        if !guard.try_begin_submit() {
            return Err(AppError::SubmissionInProgress);
        }

        let submission = order.into_submission(&state.config.phone_country_code);
        let api_key = guard.intent.api_key.clone();
        let task = tokio::spawn({
            let state = state.clone();
            let session = session.clone();
            async move {
                let result = state.gateway.submit(&api_key, &submission).await;
                session.lock().finish_submit();
                if result.is_ok() {
                    state.sessions.close(id);
                }
                result
            }
        });
        guard.track_submission(task.abort_handle());

        (task, guard.intent.callback_url.clone())
    };

    let result = match task.await {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => {
            info!("Submission for session {} aborted", id);
            return Err(AppError::SubmissionCancelled);
        }
        Err(e) => {
            session.lock().finish_submit();
            return Err(AppError::Internal(e.to_string()));
        }
    };

    let uniform = state.config.uniform_success_redirect;
    let response = match result {
        Ok(reference) => {
            info!("Session {} submitted as order {}", id, reference);
            SubmitResponse {
                redirect_url: callback_redirect(&callback_url, DeliveryOutcome::Success, uniform),
                order_reference: Some(reference),
                error: None,
            }
        }
        Err(e) => {
            error!("Submission for session {} failed: {}", id, e);
            SubmitResponse {
                redirect_url: callback_redirect(&callback_url, DeliveryOutcome::Failure, uniform),
                order_reference: None,
                error: Some(e.to_string()),
            }
        }
    };

    let message = if response.order_reference.is_some() {
        "Order submitted"
    } else {
        "Order submission failed"
    };

    Ok(Json(ApiResponse {
        data: response,
        message: message.to_string(),
    }))
}
