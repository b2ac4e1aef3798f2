//! Landing page content
//!
//! A single JSON document under a fixed settings key. Defaults are served
//! until an admin saves something.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::{Capability, Session};
use crate::data::{Database, Feature, HOME_CONTENT_KEY, HomeContent};
use crate::error::AppError;
use super::AssetService;
use crate::storage::AssetResolver;
use crate::storage::resolver::is_absolute_url;

/// Home content with the hero image resolved for display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomePage {
    pub hero_title: String,
    pub hero_subtitle: String,
    pub features: Vec<Feature>,
    pub hero_image: Option<String>,
    /// Stored reference behind `hero_image`
    pub hero_image_path: Option<String>,
}

/// Editable text fields; the hero image goes through the asset pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeContentInput {
    pub hero_title: String,
    #[serde(default)]
    pub hero_subtitle: String,
    #[serde(default)]
    pub features: Vec<Feature>,
    /// External image URL replacing the current hero image
    ///
    /// Absent keeps the current image and an empty string clears an
    /// external one. The resolved `heroImage` is never read back.
    #[serde(default)]
    pub external_hero_image_url: Option<String>,
}

pub(crate) async fn load_home_content(db: &Database) -> Result<HomeContent, AppError> {
    match db.get_setting(HOME_CONTENT_KEY).await? {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("stored home content is invalid: {e}"))
        }),
        None => Ok(HomeContent::default()),
    }
}

pub(crate) async fn store_home_content(
    db: &Database,
    content: &HomeContent,
) -> Result<(), AppError> {
    let raw = serde_json::to_string(content).map_err(|e| AppError::Internal(e.into()))?;
    db.put_setting(HOME_CONTENT_KEY, &raw).await
}

pub struct HomeService {
    db: Arc<Database>,
    resolver: AssetResolver,
    assets: AssetService,
}

impl HomeService {
    pub fn new(db: Arc<Database>, resolver: AssetResolver, assets: AssetService) -> Self {
        Self {
            db,
            resolver,
            assets,
        }
    }

    pub async fn get(&self) -> Result<HomePage, AppError> {
        let content = load_home_content(&self.db).await?;
        Ok(self.resolve(content).await)
    }

    pub(crate) async fn resolve(&self, content: HomeContent) -> HomePage {
        HomePage {
            hero_image: self.resolver.resolve_opt(content.hero_image.as_deref()).await,
            hero_title: content.hero_title,
            hero_subtitle: content.hero_subtitle,
            features: content.features,
            hero_image_path: content.hero_image,
        }
    }

    pub async fn save(&self, admin: &Session, input: HomeContentInput) -> Result<HomePage, AppError> {
        admin.require(Capability::ManageSiteContent)?;

        if input.hero_title.trim().is_empty() {
            return Err(AppError::Validation("heroTitle is required".to_string()));
        }
        if input
            .features
            .iter()
            .any(|feature| feature.title.trim().is_empty())
        {
            return Err(AppError::Validation(
                "every feature needs a title".to_string(),
            ));
        }
        let replacement = input
            .external_hero_image_url
            .map(|url| url.trim().to_string());
        if replacement
            .as_deref()
            .is_some_and(|url| !url.is_empty() && !is_absolute_url(url))
        {
            return Err(AppError::Validation(
                "externalHeroImageUrl must be an absolute URL".to_string(),
            ));
        }

        let current = load_home_content(&self.db).await?;
        let (hero_image, replaced) = match replacement {
            Some(url) if !url.is_empty() => (Some(url), current.hero_image),
            // Clearing only drops an external URL; uploads are removed
            // through the asset pipeline
            Some(_) => match current.hero_image {
                Some(key) if !is_absolute_url(&key) => (Some(key), None),
                _ => (None, None),
            },
            None => (current.hero_image, None),
        };
        let content = HomeContent {
            hero_title: input.hero_title.trim().to_string(),
            hero_subtitle: input.hero_subtitle.trim().to_string(),
            features: input
                .features
                .into_iter()
                .map(|feature| Feature {
                    title: feature.title.trim().to_string(),
                    description: feature.description.trim().to_string(),
                })
                .collect(),
            hero_image,
        };

        store_home_content(&self.db, &content).await?;
        tracing::info!(features = content.features.len(), "Home content saved");

        self.assets.discard(replaced).await;

        Ok(self.resolve(content).await)
    }
}
