//! Asset storage using Cloudflare R2
//!
//! Handles upload, delete, and presigned URL generation for course images,
//! certificate signatures, hero images and library videos. The bucket is
//! private; every read goes through a presigned URL.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;

use super::ObjectStore;
use crate::error::AppError;

/// Asset storage service
pub struct MediaStorage {
    /// S3-compatible client for R2
    client: S3Client,
    /// Asset bucket name
    bucket: String,
}

impl MediaStorage {
    /// Create new asset storage client
    ///
    /// No network call is made here; credentials are checked on first use.
    ///
    /// # Errors
    /// Returns error if the endpoint is not a valid URL
    pub fn new(config: &crate::config::StorageConfig) -> Result<Self, AppError> {
        use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

        url::Url::parse(&config.endpoint).map_err(|e| {
            AppError::Config(format!(
                "storage.endpoint is not a valid URL ({}): {}",
                config.endpoint, e
            ))
        })?;

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "academy-r2",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .http_client(super::build_r2_http_client())
            .force_path_style(true)
            .build();

        Ok(Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for MediaStorage {
    /// Upload an asset
    ///
    /// # Example
    /// ```ignore
    /// let key = storage.upload(
    ///     "01H.../courses/c1-01J....png",
    ///     image_data,
    ///     "image/png"
    /// ).await?;
    /// ```
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        use aws_sdk_s3::primitives::ByteStream;

        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .cache_control("private, max-age=3600")
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("R2 upload failed: {}", e)))?;

        tracing::debug!(key, size, content_type, "Asset uploaded");
        Ok(key.to_string())
    }

    async fn create_signed_url(&self, key: &str, ttl: Duration) -> Result<String, AppError> {
        use aws_sdk_s3::presigning::PresigningConfig;

        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| AppError::Storage(format!("invalid presign duration: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| AppError::Storage(format!("R2 presign failed: {}", e)))?;

        Ok(request.uri().to_string())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), AppError> {
        for key in keys {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| AppError::Storage(format!("R2 delete failed: {}", e)))?;
        }

        Ok(())
    }
}
