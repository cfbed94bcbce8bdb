//! On-demand push dispatch and scheduled processing.
//!
//! These endpoints keep their own failure bodies: send-push answers
//! `{"error"}` and process-scheduled answers `{"success": false, "error"}`.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use newsdesk_shared::{ProcessScheduledResponse, SendPushRequest};
use serde_json::json;
use tracing::error;

use crate::common::{ApiError, Capability};
use crate::domains::notifications::actions;
use crate::server::app::AxumAppState;
use crate::server::middleware::AuthUser;

pub fn router() -> Router {
    Router::new()
        .route(
            "/functions/send-push-notification",
            post(send_push_notification),
        )
        .route(
            "/functions/process-scheduled-notifications",
            post(process_scheduled_notifications),
        )
}

async fn send_push_notification(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Json(request): Json<SendPushRequest>,
) -> Response {
    let actor = match user.actor(&state.deps).await {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };

    match actions::send_push_notification(actor, request, &state.deps).await {
        Ok(response) => Json(response).into_response(),
        Err(ApiError::Internal(e)) => {
            error!(error = %e, "send-push-notification failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

async fn process_scheduled_notifications(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
) -> Response {
    let checked = match user.actor(&state.deps).await {
        Ok(actor) => actor
            .can(Capability::ManageNotifications)
            .check()
            .map_err(ApiError::from),
        Err(e) => Err(e),
    };
    if let Err(e) = checked {
        return e.into_response();
    }

    match actions::process_scheduled_notifications(&state.deps).await {
        Ok(processed) if processed.is_empty() => Json(ProcessScheduledResponse {
            success: true,
            message: Some(actions::NOTHING_SCHEDULED_MESSAGE.to_string()),
            processed: None,
        })
        .into_response(),
        Ok(processed) => Json(ProcessScheduledResponse {
            success: true,
            message: None,
            processed: Some(processed),
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "process-scheduled-notifications failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
