//! Notification feed endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::Notification;

/// GET /api/notifications
async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Json<Vec<Notification>> {
    Json(state.notifications.list(&session.user_id).await)
}

/// DELETE /api/notifications/:id
async fn dismiss_notification(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    if state.notifications.dismiss(&session.user_id, id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

pub fn notifications_router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id", delete(dismiss_notification))
}
