//! AI assistant endpoints
//!
//! All of them answer 501 when no model API key is configured.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use super::dto::{ChatRequest, ChatResponse, VideoRequest};
use crate::AppState;
use crate::ai::{GeminiClient, VideoJob, VideoJobs};
use crate::auth::{Capability, CurrentUser};
use crate::error::AppError;

fn assistant_disabled() -> AppError {
    AppError::NotImplemented("the AI assistant is not configured".to_string())
}

fn chat_client(state: &AppState) -> Result<&GeminiClient, AppError> {
    state.ai.as_ref().ok_or_else(assistant_disabled)
}

fn video_jobs(state: &AppState) -> Result<Arc<VideoJobs>, AppError> {
    state.video_jobs.clone().ok_or_else(assistant_disabled)
}

/// POST /api/ai/chat
async fn chat(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    session.require(Capability::UseAssistant)?;
    let reply = chat_client(&state)?
        .chat(&request.history, &request.message)
        .await?;
    Ok(Json(ChatResponse { reply }))
}

/// POST /api/ai/videos
async fn start_video(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<VideoRequest>,
) -> Result<(StatusCode, Json<VideoJob>), AppError> {
    session.require(Capability::UseAssistant)?;
    let job = video_jobs(&state)?
        .start(&session.user_id, &request.prompt, &request.config)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// GET /api/ai/videos/:id
async fn get_video_job(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<VideoJob>, AppError> {
    session.require(Capability::UseAssistant)?;
    Ok(Json(video_jobs(&state)?.get(&session.user_id, &id).await?))
}

/// DELETE /api/ai/videos/:id
async fn cancel_video_job(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<VideoJob>, AppError> {
    session.require(Capability::UseAssistant)?;
    Ok(Json(
        video_jobs(&state)?.cancel(&session.user_id, &id).await?,
    ))
}

pub fn ai_router() -> Router<AppState> {
    Router::new()
        .route("/ai/chat", post(chat))
        .route("/ai/videos", post(start_video))
        .route("/ai/videos/:id", get(get_video_job).delete(cancel_video_job))
}
