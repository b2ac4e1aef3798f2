//! Course catalog
//!
//! Reads return courses with image and signature references resolved to
//! temporary URLs. Writes are validated and sanitized before they reach the
//! database, and the response is built only from what was stored.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Deserialize;

use crate::auth::{Capability, Session};
use crate::data::{Course, CourseRow, Database, EntityId, Level};
use crate::error::AppError;
use crate::storage::resolver::is_absolute_url;
use crate::storage::{AssetResolver, ObjectStore};

/// Editable course fields
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    /// Optional on create; a ULID is generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub outline: Option<String>,
    pub instructor: String,
    #[serde(default)]
    pub instructor_bio: Option<String>,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    /// External cover URL replacing the current cover
    ///
    /// Absent keeps the current cover and an empty string clears an external
    /// one. The resolved `image` of a fetched course is never read back.
    #[serde(default)]
    pub external_image_url: Option<String>,
}

fn sanitize_rich_text(content: &str) -> String {
    ammonia::clean(content)
}

fn sanitize_optional(content: Option<String>) -> Option<String> {
    content
        .map(|value| sanitize_rich_text(value.trim()))
        .filter(|value| !value.is_empty())
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

impl CourseInput {
    fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".to_string()));
        }
        if self.instructor.trim().is_empty() {
            return Err(AppError::Validation("instructor is required".to_string()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::Validation(
                "price must be zero or greater".to_string(),
            ));
        }
        if let Some(url) = self.external_image_url.as_deref().map(str::trim) {
            if !url.is_empty() && !is_absolute_url(url) {
                return Err(AppError::Validation(
                    "externalImageUrl must be an absolute URL".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Build the row to store, keeping asset keys and creation time of
    /// `existing`
    fn into_row(self, id: String, existing: Option<&CourseRow>) -> Result<CourseRow, AppError> {
        let now = Utc::now();
        let tags = serde_json::to_string(&normalize_tags(self.tags))
            .map_err(|e| AppError::Internal(e.into()))?;
        let kept_path = existing.and_then(|row| row.image_path.clone());
        let replacement = self
            .external_image_url
            .map(|url| url.trim().to_string());
        let (image, image_path) = match replacement {
            Some(url) if !url.is_empty() => (Some(url), None),
            Some(_) => (None, kept_path),
            None => (existing.and_then(|row| row.image.clone()), kept_path),
        };

        Ok(CourseRow {
            id,
            title: self.title.trim().to_string(),
            description: sanitize_rich_text(self.description.trim()),
            outline: sanitize_optional(self.outline),
            instructor: self.instructor.trim().to_string(),
            instructor_bio: sanitize_optional(self.instructor_bio),
            duration: self.duration.trim().to_string(),
            level: self.level.as_str().to_string(),
            price: self.price,
            tags,
            image,
            image_path,
            signature_path: existing.and_then(|row| row.signature_path.clone()),
            created_at: existing.map(|row| row.created_at).unwrap_or(now),
            updated_at: now,
        })
    }
}

/// Course catalog operations
pub struct CatalogService {
    db: Arc<Database>,
    store: Arc<dyn ObjectStore>,
    resolver: AssetResolver,
}

impl CatalogService {
    pub fn new(db: Arc<Database>, store: Arc<dyn ObjectStore>, resolver: AssetResolver) -> Self {
        Self {
            db,
            store,
            resolver,
        }
    }

    /// Resolve a stored row into the public view
    pub async fn enrich(&self, row: CourseRow) -> Course {
        let (image, signature_image) = tokio::join!(
            self.resolver.resolve_opt(row.image_reference()),
            self.resolver.resolve_opt(row.signature_path.as_deref()),
        );

        Course {
            tags: row.tag_list(),
            level: Level::parse(&row.level),
            id: row.id,
            title: row.title,
            description: row.description,
            outline: row.outline,
            instructor: row.instructor,
            instructor_bio: row.instructor_bio,
            duration: row.duration,
            price: row.price,
            image,
            image_path: row.image_path,
            signature_image,
            signature_path: row.signature_path,
        }
    }

    /// Every course, oldest first, each resolved independently
    pub async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        let rows = self.db.list_courses().await?;
        // Resolve in parallel (max 10 concurrent), keeping row order
        Ok(stream::iter(rows)
            .map(|row| self.enrich(row))
            .buffered(10)
            .collect::<Vec<_>>()
            .await)
    }

    pub async fn get_course(&self, id: &str) -> Result<Course, AppError> {
        let row = self.db.get_course(id).await?.ok_or(AppError::NotFound)?;
        Ok(self.enrich(row).await)
    }

    /// Create a new course
    ///
    /// # Errors
    /// `Conflict` when the supplied id is taken
    pub async fn create_course(
        &self,
        admin: &Session,
        input: CourseInput,
    ) -> Result<Course, AppError> {
        admin.require(Capability::ManageCatalog)?;
        input.validate()?;

        let id = input
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| EntityId::new().0);
        if self.db.get_course(&id).await?.is_some() {
            return Err(AppError::Conflict(format!("course {id} already exists")));
        }

        let row = input.into_row(id, None)?;
        self.db.upsert_course(&row).await?;
        tracing::info!(course_id = %row.id, title = %row.title, "Course created");

        self.get_course(&row.id).await
    }

    /// Create or update the course `id`
    pub async fn save_course(
        &self,
        admin: &Session,
        id: &str,
        input: CourseInput,
    ) -> Result<Course, AppError> {
        admin.require(Capability::ManageCatalog)?;
        input.validate()?;

        let existing = self.db.get_course(id).await?;
        let row = input.into_row(id.to_string(), existing.as_ref())?;
        self.db.upsert_course(&row).await?;
        tracing::info!(
            course_id = %row.id,
            created = existing.is_none(),
            "Course saved"
        );

        // A replaced uploaded cover is no longer referenced
        if let Some(previous) = existing
            .and_then(|row| row.image_path)
            .filter(|_| row.image_path.is_none())
        {
            self.remove_objects(vec![previous]).await;
        }

        self.get_course(&row.id).await
    }

    /// Delete a course and its enrollments
    ///
    /// Stored assets are removed afterwards on a best-effort basis.
    pub async fn delete_course(&self, admin: &Session, id: &str) -> Result<(), AppError> {
        admin.require(Capability::ManageCatalog)?;
        let row = self.db.get_course(id).await?.ok_or(AppError::NotFound)?;

        let enrollments = self.db.delete_course(id).await?;
        tracing::info!(course_id = id, enrollments, "Course deleted");

        let keys: Vec<String> = [row.image_path, row.signature_path]
            .into_iter()
            .flatten()
            .collect();
        self.remove_objects(keys).await;

        Ok(())
    }

    async fn remove_objects(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        if let Err(error) = self.store.remove(&keys).await {
            tracing::warn!(?keys, %error, "Failed to remove stored course assets");
        }
    }
}
