//! Admin API endpoints
//!
//! Course management, completion review, site content and the video
//! library. Every handler authenticates the caller; the services check the
//! capability each operation needs.

use axum::{
    Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
};

use super::upload::read_upload;
use crate::AppState;
use crate::auth::{Capability, CurrentUser, Session};
use crate::data::{Course, Enrollment, User, Video};
use crate::error::AppError;
use crate::service::{
    CourseAsset, CourseInput, HomeContentInput, HomePage, PendingRequest, StoredAsset,
};
use crate::storage::AssetCategory;

/// Create admin router
///
/// Routes:
/// - POST /api/admin/courses - Create course
/// - PUT/DELETE /api/admin/courses/:id - Save or delete course
/// - POST/DELETE /api/admin/courses/:id/image - Cover image
/// - POST/DELETE /api/admin/courses/:id/signature - Certificate signature
/// - GET /api/admin/users - Users with enrollment sets
/// - GET /api/admin/reviews - Pending completion requests
/// - POST /api/admin/reviews/:user_id/:course_id/{approve,reject}
/// - PUT /api/admin/home - Landing page content
/// - POST/DELETE /api/admin/home/hero_image - Hero image
/// - POST /api/admin/videos, DELETE /api/admin/videos/:id - Video library
pub fn admin_router() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/courses", post(create_course))
        .route("/courses/:id", put(save_course).delete(delete_course))
        .route(
            "/courses/:id/image",
            post(upload_course_image).delete(remove_course_image),
        )
        .route(
            "/courses/:id/signature",
            post(upload_signature).delete(remove_signature),
        )
        // Review
        .route("/users", get(list_users))
        .route("/reviews", get(list_reviews))
        .route("/reviews/:user_id/:course_id/approve", post(approve))
        .route("/reviews/:user_id/:course_id/reject", post(reject))
        // Site content
        .route("/home", put(save_home))
        .route(
            "/home/hero_image",
            post(upload_hero_image).delete(remove_hero_image),
        )
        // Video library
        .route("/videos", post(upload_video))
        .route("/videos/:id", axum::routing::delete(delete_video))
}

// =============================================================================
// Catalog
// =============================================================================

/// POST /api/admin/courses
async fn create_course(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Json(input): Json<CourseInput>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let course = state.catalog().create_course(&admin, input).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// PUT /api/admin/courses/:id
async fn save_course(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<CourseInput>,
) -> Result<Json<Course>, AppError> {
    Ok(Json(state.catalog().save_course(&admin, &id, input).await?))
}

/// DELETE /api/admin/courses/:id
///
/// Also deletes the course's enrollments.
async fn delete_course(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.catalog().delete_course(&admin, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_course_asset(
    state: AppState,
    admin: Session,
    course_id: String,
    slot: CourseAsset,
    multipart: Multipart,
) -> Result<Json<StoredAsset>, AppError> {
    // Checked before the body is read
    admin.require(Capability::ManageCatalog)?;
    let upload = read_upload(multipart, slot.category(), &state.upload_limits()).await?;
    let stored = state
        .assets()
        .upload_course_asset(&admin, &course_id, slot, upload.file)
        .await?;
    Ok(Json(stored))
}

/// POST /api/admin/courses/:id/image
async fn upload_course_image(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<StoredAsset>, AppError> {
    upload_course_asset(state, admin, id, CourseAsset::Cover, multipart).await
}

/// DELETE /api/admin/courses/:id/image
async fn remove_course_image(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .assets()
        .remove_course_asset(&admin, &id, CourseAsset::Cover)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/courses/:id/signature
async fn upload_signature(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<StoredAsset>, AppError> {
    upload_course_asset(state, admin, id, CourseAsset::Signature, multipart).await
}

/// DELETE /api/admin/courses/:id/signature
async fn remove_signature(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .assets()
        .remove_course_asset(&admin, &id, CourseAsset::Signature)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Review
// =============================================================================

/// GET /api/admin/users
async fn list_users(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.reviews().users(&admin).await?))
}

/// GET /api/admin/reviews
async fn list_reviews(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
) -> Result<Json<Vec<PendingRequest>>, AppError> {
    Ok(Json(state.reviews().queue(&admin).await?))
}

/// POST /api/admin/reviews/:user_id/:course_id/approve
async fn approve(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path((user_id, course_id)): Path<(String, String)>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = state
        .enrollments()
        .approve_completion(&admin, &user_id, &course_id)
        .await?;
    Ok(Json(enrollment))
}

/// POST /api/admin/reviews/:user_id/:course_id/reject
async fn reject(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path((user_id, course_id)): Path<(String, String)>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = state
        .enrollments()
        .reject_completion(&admin, &user_id, &course_id)
        .await?;
    Ok(Json(enrollment))
}

// =============================================================================
// Site content
// =============================================================================

/// PUT /api/admin/home
async fn save_home(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Json(input): Json<HomeContentInput>,
) -> Result<Json<HomePage>, AppError> {
    Ok(Json(state.home().save(&admin, input).await?))
}

/// POST /api/admin/home/hero_image
async fn upload_hero_image(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    multipart: Multipart,
) -> Result<Json<StoredAsset>, AppError> {
    admin.require(Capability::ManageSiteContent)?;
    let upload = read_upload(multipart, AssetCategory::Home, &state.upload_limits()).await?;
    Ok(Json(
        state.assets().upload_hero_image(&admin, upload.file).await?,
    ))
}

/// DELETE /api/admin/home/hero_image
async fn remove_hero_image(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
) -> Result<StatusCode, AppError> {
    state.assets().remove_hero_image(&admin).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Video library
// =============================================================================

/// POST /api/admin/videos
///
/// Multipart form: `file`, `title`, optional `description`.
async fn upload_video(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Video>), AppError> {
    admin.require(Capability::ManageVideos)?;
    let mut upload = read_upload(multipart, AssetCategory::Videos, &state.upload_limits()).await?;
    let title = upload.fields.remove("title").unwrap_or_default();
    let description = upload.fields.remove("description");

    let video = state
        .videos()
        .upload(&admin, &title, description, upload.file)
        .await?;
    Ok((StatusCode::CREATED, Json(video)))
}

/// DELETE /api/admin/videos/:id
async fn delete_video(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.videos().delete(&admin, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
