//! Video library

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use super::assets::{AssetService, UploadedFile};
use crate::auth::{Capability, Session};
use crate::data::{Database, EntityId, Video, VideoRow};
use crate::error::AppError;
use crate::storage::resolver::is_absolute_url;
use crate::storage::{AssetCategory, AssetResolver, ObjectStore};

pub struct VideoService {
    db: Arc<Database>,
    store: Arc<dyn ObjectStore>,
    resolver: AssetResolver,
    assets: AssetService,
}

impl VideoService {
    pub fn new(
        db: Arc<Database>,
        store: Arc<dyn ObjectStore>,
        resolver: AssetResolver,
        assets: AssetService,
    ) -> Self {
        Self {
            db,
            store,
            resolver,
            assets,
        }
    }

    async fn enrich(&self, row: VideoRow) -> Video {
        Video {
            url: self.resolver.resolve(&row.video_path).await,
            id: row.id,
            title: row.title,
            description: row.description,
            video_path: row.video_path,
            content_type: row.content_type,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }

    /// Newest first, each URL resolved independently
    pub async fn list(&self) -> Result<Vec<Video>, AppError> {
        let rows = self.db.list_videos().await?;
        // Resolve in parallel (max 10 concurrent), keeping row order
        Ok(stream::iter(rows)
            .map(|row| self.enrich(row))
            .buffered(10)
            .collect::<Vec<_>>()
            .await)
    }

    pub async fn upload(
        &self,
        admin: &Session,
        title: &str,
        description: Option<String>,
        file: UploadedFile,
    ) -> Result<Video, AppError> {
        admin.require(Capability::ManageVideos)?;
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("title is required".to_string()));
        }

        let id = EntityId::new().0;
        let content_type = file.content_type.clone();
        let key = self
            .assets
            .store_upload(&admin.user_id, AssetCategory::Videos, &id, file)
            .await?;

        let row = VideoRow {
            id,
            title: title.to_string(),
            description: description
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            video_path: key.clone(),
            content_type,
            created_by: admin.user_id.clone(),
            created_at: Utc::now(),
        };
        if let Err(error) = self.db.insert_video(&row).await {
            self.assets.discard(Some(key)).await;
            return Err(error);
        }
        tracing::info!(video_id = %row.id, key = %row.video_path, "Video added");

        Ok(self.enrich(row).await)
    }

    /// Remove the stored object, then the row
    pub async fn delete(&self, admin: &Session, id: &str) -> Result<(), AppError> {
        admin.require(Capability::ManageVideos)?;
        let row = self.db.get_video(id).await?.ok_or(AppError::NotFound)?;

        if !is_absolute_url(&row.video_path) {
            self.store.remove(std::slice::from_ref(&row.video_path)).await?;
        }
        self.db.delete_video(id).await?;
        tracing::info!(video_id = id, "Video deleted");
        Ok(())
    }
}
