//! Academy - course catalog, enrollment and certificate backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Public catalog, home and video endpoints                 │
//! │  - Student enrollment and notification endpoints            │
//! │  - Admin endpoints (capability-checked)                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Enrollment state machine, catalog, review queue          │
//! │  - Notification bus, upload pipeline, AI assistant          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - R2 object storage with presigned URLs                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `ai`: Generative model client and video jobs
//! - `data`: Database layer
//! - `storage`: Object storage, asset resolution and upload validation
//! - `auth`: Passwords, sessions, capabilities and rate limiting
//! - `config`: Configuration management
//! - `error`: Error types

pub mod ai;
pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
///
/// This struct is cloned for each request. Services are cheap to build
/// from it and are constructed per request.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Asset object store (Cloudflare R2 in production)
    pub storage: Arc<dyn storage::ObjectStore>,

    /// Per-user notification feeds
    pub notifications: Arc<service::NotificationBus>,

    /// Sign-in attempt limiter
    pub rate_limiter: Arc<auth::RateLimiter>,

    /// HTTP client for the generative model API
    pub http_client: Arc<reqwest::Client>,

    /// Chat client, None when the assistant is not configured
    pub ai: Option<ai::GeminiClient>,

    /// Video generation jobs, None when the assistant is not configured
    pub video_jobs: Option<Arc<ai::VideoJobs>>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Connect to R2 storage
    /// 3. Build the notification bus, rate limiter and AI client
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let storage = storage::MediaStorage::new(&config.storage)?;
        tracing::info!(bucket = %config.storage.bucket, "Asset storage initialized");
        Self::with_storage(config, Arc::new(storage)).await
    }

    /// Initialize application state over a caller-provided object store
    pub async fn with_storage(
        config: config::AppConfig,
        storage: Arc<dyn storage::ObjectStore>,
    ) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!("Database connected");

        // 2. Initialize HTTP client
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("Academy/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;
        let http_client = Arc::new(http_client);

        // 3. Shared in-memory state
        let notifications = Arc::new(service::NotificationBus::new(Duration::from_secs(
            config.notifications.ttl_seconds,
        )));
        let rate_limiter = Arc::new(auth::RateLimiter::new(
            config.auth.sign_in_max_attempts,
            Duration::from_secs(config.auth.sign_in_window_seconds),
        ));

        // 4. AI assistant
        let ai = ai::GeminiClient::from_config(&config.ai, Arc::clone(&http_client));
        let video_jobs = ai.clone().map(|client| {
            Arc::new(ai::VideoJobs::new(
                Arc::new(client),
                ai::PollPolicy::from_config(&config.ai),
                Duration::from_secs(config.ai.job_retention_seconds),
            ))
        });
        if ai.is_some() {
            tracing::info!(chat_model = %config.ai.chat_model, "AI assistant enabled");
        } else {
            tracing::info!("AI assistant disabled: ai.api_key is not set");
        }

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            storage,
            notifications,
            rate_limiter,
            http_client,
            ai,
            video_jobs,
        })
    }

    pub fn resolver(&self) -> storage::AssetResolver {
        storage::AssetResolver::new(
            Arc::clone(&self.storage),
            Duration::from_secs(self.config.storage.signed_url_ttl_seconds),
        )
    }

    pub fn mailer(&self) -> service::Mailer {
        service::Mailer::new(Arc::clone(&self.notifications))
    }

    pub fn upload_limits(&self) -> storage::UploadLimits {
        storage::UploadLimits::from_config(&self.config.storage)
    }

    pub fn accounts(&self) -> service::AccountService {
        service::AccountService::new(
            Arc::clone(&self.db),
            Arc::clone(&self.config),
            Arc::clone(&self.rate_limiter),
        )
    }

    pub fn catalog(&self) -> service::CatalogService {
        service::CatalogService::new(
            Arc::clone(&self.db),
            Arc::clone(&self.storage),
            self.resolver(),
        )
    }

    pub fn enrollments(&self) -> service::EnrollmentService {
        service::EnrollmentService::new(
            Arc::clone(&self.db),
            self.resolver(),
            Arc::clone(&self.notifications),
            self.mailer(),
        )
    }

    pub fn reviews(&self) -> service::ReviewService {
        service::ReviewService::new(Arc::clone(&self.db), self.catalog())
    }

    pub fn home(&self) -> service::HomeService {
        service::HomeService::new(Arc::clone(&self.db), self.resolver(), self.assets())
    }

    pub fn assets(&self) -> service::AssetService {
        service::AssetService::new(
            Arc::clone(&self.db),
            Arc::clone(&self.storage),
            self.resolver(),
            self.upload_limits(),
        )
    }

    pub fn videos(&self) -> service::VideoService {
        service::VideoService::new(
            Arc::clone(&self.db),
            Arc::clone(&self.storage),
            self.resolver(),
            self.assets(),
        )
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit, middleware};
    use tower_http::{
        compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
    };

    let cors_layer = build_cors_layer(&state.config.server);
    // Multipart framing needs some headroom above the largest upload
    let body_limit = state.upload_limits().max_video_bytes + 1024 * 1024;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::api_router())
        .merge(api::metrics_router(state.clone()))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(api::track_http_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
