//! Public catalog endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::AppState;
use crate::data::Course;
use crate::error::AppError;

/// GET /api/courses
async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    Ok(Json(state.catalog().list_courses().await?))
}

/// GET /api/courses/:id
async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Course>, AppError> {
    Ok(Json(state.catalog().get_course(&id).await?))
}

pub fn courses_router() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_courses))
        .route("/courses/:id", get(get_course))
}
