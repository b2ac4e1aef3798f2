//! API layer
//!
//! HTTP handlers for:
//! - Public catalog, home and video library
//! - Accounts and sessions
//! - Student enrollments and notifications
//! - AI assistant
//! - Admin API
//! - Metrics (Prometheus)

mod admin;
mod ai;
mod auth;
mod courses;
mod dto;
mod enrollments;
mod home;
pub mod metrics;
mod notifications;
mod upload;

use axum::Router;

use crate::AppState;

pub use dto::*;
pub use metrics::{metrics_router, track_http_metrics};
pub use upload::{MultipartUpload, read_upload};

/// All `/api` routes
///
/// Authentication is enforced per handler through the `CurrentUser`
/// extractor; admin routes additionally check capabilities.
pub fn api_router() -> Router<AppState> {
    let public_routes = Router::new()
        .merge(courses::courses_router())
        .merge(home::home_router())
        .merge(auth::auth_router());

    let authenticated_routes = Router::new()
        .merge(enrollments::enrollments_router())
        .merge(notifications::notifications_router())
        .merge(ai::ai_router())
        .nest("/admin", admin::admin_router());

    public_routes.merge(authenticated_routes)
}
