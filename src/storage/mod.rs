//! Object storage module
//!
//! Handles:
//! - Asset upload/removal in a private S3-compatible bucket (Cloudflare R2)
//! - Presigned, time-limited URLs for reading those assets
//! - Upload validation and key layout

mod media;
pub mod resolver;
pub mod upload;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppError;

pub use media::MediaStorage;
pub use resolver::{AssetResolver, is_absolute_url};
pub use upload::{AssetCategory, UploadError, UploadLimits};

/// Narrow interface over the object store
///
/// Implemented by [`MediaStorage`] in production; tests substitute an
/// in-memory store or a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`, returning the key that was written
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str)
    -> Result<String, AppError>;

    /// Create a GET URL for `key` that stays valid for `ttl`
    async fn create_signed_url(&self, key: &str, ttl: Duration) -> Result<String, AppError>;

    /// Remove the given keys; missing keys are not an error
    async fn remove(&self, keys: &[String]) -> Result<(), AppError>;
}

pub(crate) fn build_r2_http_client() -> aws_sdk_s3::config::SharedHttpClient {
    use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_only()
        .enable_http1()
        .enable_http2()
        .build();

    HyperClientBuilder::new().build(https_connector)
}
