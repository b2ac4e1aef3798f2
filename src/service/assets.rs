//! Asset upload pipeline
//!
//! validate -> upload -> bind key to the owning record -> presign a fresh URL.
//! Removal deletes the object first, then clears the record.

use std::sync::Arc;

use serde::Serialize;

use super::home::{load_home_content, store_home_content};
use crate::auth::{Capability, Session};
use crate::data::Database;
use crate::error::AppError;
use crate::metrics::{UPLOAD_BYTES_TOTAL, UPLOADS_TOTAL};
use crate::storage::resolver::is_absolute_url;
use crate::storage::upload::{object_key, validate};
use crate::storage::{AssetCategory, AssetResolver, ObjectStore, UploadLimits};

/// Sub id used for the singleton hero image
const HERO_SLOT: &str = "hero";

/// Binary payload with its declared type
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Result of binding an upload to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAsset {
    pub path: String,
    pub url: Option<String>,
}

/// Which course slot an asset belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseAsset {
    Cover,
    Signature,
}

impl CourseAsset {
    pub fn category(&self) -> AssetCategory {
        match self {
            Self::Cover => AssetCategory::Courses,
            Self::Signature => AssetCategory::Signatures,
        }
    }
}

pub struct AssetService {
    db: Arc<Database>,
    store: Arc<dyn ObjectStore>,
    resolver: AssetResolver,
    limits: UploadLimits,
}

impl AssetService {
    pub fn new(
        db: Arc<Database>,
        store: Arc<dyn ObjectStore>,
        resolver: AssetResolver,
        limits: UploadLimits,
    ) -> Self {
        Self {
            db,
            store,
            resolver,
            limits,
        }
    }

    /// Validate and upload, returning the new key
    ///
    /// Nothing reaches the store when validation fails.
    pub async fn store_upload(
        &self,
        owner_id: &str,
        category: AssetCategory,
        sub_id: &str,
        file: UploadedFile,
    ) -> Result<String, AppError> {
        validate(category, &file.content_type, file.data.len(), &self.limits)?;

        let size = file.data.len();
        let key = object_key(owner_id, category, sub_id, &file.content_type);
        let key = self
            .store
            .upload(&key, file.data, &file.content_type)
            .await?;

        UPLOADS_TOTAL
            .with_label_values(&[category.as_str()])
            .inc();
        UPLOAD_BYTES_TOTAL.inc_by(size as f64);
        tracing::info!(key = %key, category = category.as_str(), size, "Asset uploaded");

        Ok(key)
    }

    /// Best-effort removal of objects that are no longer referenced
    pub async fn discard(&self, key: Option<String>) {
        let Some(key) = key.filter(|key| !is_absolute_url(key)) else {
            return;
        };
        if let Err(error) = self.store.remove(std::slice::from_ref(&key)).await {
            tracing::warn!(key = %key, %error, "Failed to remove replaced asset");
        }
    }

    async fn bound(&self, key: String) -> StoredAsset {
        let url = self.resolver.resolve(&key).await;
        StoredAsset { path: key, url }
    }

    /// Upload a course cover or signature and bind it to the course
    pub async fn upload_course_asset(
        &self,
        admin: &Session,
        course_id: &str,
        slot: CourseAsset,
        file: UploadedFile,
    ) -> Result<StoredAsset, AppError> {
        admin.require(Capability::ManageCatalog)?;
        let course = self
            .db
            .get_course(course_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let key = self
            .store_upload(&admin.user_id, slot.category(), course_id, file)
            .await?;

        let (bind, previous) = match slot {
            CourseAsset::Cover => (
                self.db.set_course_image_path(course_id, Some(&key)).await,
                course.image_path,
            ),
            CourseAsset::Signature => (
                self.db.set_course_signature_path(course_id, Some(&key)).await,
                course.signature_path,
            ),
        };
        if let Err(error) = bind {
            self.discard(Some(key)).await;
            return Err(error);
        }

        self.discard(previous).await;
        Ok(self.bound(key).await)
    }

    /// Delete a course cover or signature object and clear the reference
    pub async fn remove_course_asset(
        &self,
        admin: &Session,
        course_id: &str,
        slot: CourseAsset,
    ) -> Result<(), AppError> {
        admin.require(Capability::ManageCatalog)?;
        let course = self
            .db
            .get_course(course_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let key = match slot {
            CourseAsset::Cover => course.image_path,
            CourseAsset::Signature => course.signature_path,
        };
        if let Some(key) = key {
            self.store.remove(&[key]).await?;
        }

        match slot {
            CourseAsset::Cover => self.db.set_course_image_path(course_id, None).await?,
            CourseAsset::Signature => self.db.set_course_signature_path(course_id, None).await?,
        }
        tracing::info!(course_id, ?slot, "Course asset removed");
        Ok(())
    }

    /// Upload and bind the landing page hero image
    pub async fn upload_hero_image(
        &self,
        admin: &Session,
        file: UploadedFile,
    ) -> Result<StoredAsset, AppError> {
        admin.require(Capability::ManageSiteContent)?;
        let mut content = load_home_content(&self.db).await?;

        let key = self
            .store_upload(&admin.user_id, AssetCategory::Home, HERO_SLOT, file)
            .await?;

        let previous = content.hero_image.replace(key.clone());
        if let Err(error) = store_home_content(&self.db, &content).await {
            self.discard(Some(key)).await;
            return Err(error);
        }

        self.discard(previous).await;
        Ok(self.bound(key).await)
    }

    /// Remove the hero image object (if stored by us) and clear the reference
    pub async fn remove_hero_image(&self, admin: &Session) -> Result<(), AppError> {
        admin.require(Capability::ManageSiteContent)?;
        let mut content = load_home_content(&self.db).await?;

        if let Some(key) = content.hero_image.take() {
            if !is_absolute_url(&key) {
                self.store.remove(&[key]).await?;
            }
            store_home_content(&self.db, &content).await?;
            tracing::info!("Hero image removed");
        }
        Ok(())
    }
}
