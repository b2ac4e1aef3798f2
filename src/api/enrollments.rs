//! Student enrollment endpoints
//!
//! Every operation acts on the caller's own enrollment.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};

use super::dto::ProgressRequest;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{Enrollment, User};
use crate::error::AppError;
use crate::service::Certificate;

/// GET /api/me
async fn me(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.accounts().me(&session).await?))
}

/// POST /api/enrollments/:course_id
async fn register(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(course_id): Path<String>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = state.enrollments().register(&session, &course_id).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// PUT /api/enrollments/:course_id/progress
async fn set_progress(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(course_id): Path<String>,
    Json(request): Json<ProgressRequest>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = state
        .enrollments()
        .set_progress(&session, &course_id, request.progress)
        .await?;
    Ok(Json(enrollment))
}

/// POST /api/enrollments/:course_id/completion
async fn request_completion(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(course_id): Path<String>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = state
        .enrollments()
        .request_completion(&session, &course_id)
        .await?;
    Ok(Json(enrollment))
}

/// GET /api/enrollments/:course_id/certificate
async fn certificate(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(course_id): Path<String>,
) -> Result<Json<Certificate>, AppError> {
    Ok(Json(
        state.enrollments().certificate(&session, &course_id).await?,
    ))
}

pub fn enrollments_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/enrollments/:course_id", post(register))
        .route("/enrollments/:course_id/progress", put(set_progress))
        .route("/enrollments/:course_id/completion", post(request_completion))
        .route("/enrollments/:course_id/certificate", get(certificate))
}
