//! Public landing page and video library endpoints

use axum::{Json, Router, extract::State, routing::get};

use crate::AppState;
use crate::data::Video;
use crate::error::AppError;
use crate::service::HomePage;

/// GET /api/home
async fn get_home(State(state): State<AppState>) -> Result<Json<HomePage>, AppError> {
    Ok(Json(state.home().get().await?))
}

/// GET /api/videos
async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<Video>>, AppError> {
    Ok(Json(state.videos().list().await?))
}

pub fn home_router() -> Router<AppState> {
    Router::new()
        .route("/home", get(get_home))
        .route("/videos", get(list_videos))
}
