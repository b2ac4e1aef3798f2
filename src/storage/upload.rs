//! Upload validation and object key layout
//!
//! Every asset is checked here before any byte reaches the object store.

use thiserror::Error;

use crate::data::EntityId;
use crate::error::AppError;

/// What an uploaded asset is for; decides allowed formats and key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetCategory {
    /// Certificate signature images
    Signatures,
    /// Course cover images
    Courses,
    /// Landing page hero image
    Home,
    /// Video library entries
    Videos,
}

impl AssetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signatures => "signatures",
            Self::Courses => "courses",
            Self::Home => "home",
            Self::Videos => "videos",
        }
    }

    /// Whether `content_type` is acceptable for this category
    pub fn accepts(&self, content_type: &str) -> bool {
        let content_type = content_type.trim().to_ascii_lowercase();
        match self {
            Self::Signatures => {
                matches!(
                    content_type.as_str(),
                    "image/jpeg" | "image/png" | "image/svg+xml"
                )
            }
            Self::Courses | Self::Home => {
                matches!(
                    content_type.as_str(),
                    "image/jpeg" | "image/png" | "image/webp"
                )
            }
            Self::Videos => content_type.starts_with("video/") && content_type.len() > 6,
        }
    }

    fn allowed_description(&self) -> &'static str {
        match self {
            Self::Signatures => "JPEG, PNG or SVG",
            Self::Courses | Self::Home => "JPEG, PNG or WEBP",
            Self::Videos => "a video format",
        }
    }
}

/// Size ceilings per asset kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_image_bytes: usize,
    pub max_video_bytes: usize,
}

impl UploadLimits {
    pub fn from_config(config: &crate::config::StorageConfig) -> Self {
        Self {
            max_image_bytes: config.max_image_bytes,
            max_video_bytes: config.max_video_bytes,
        }
    }

    pub fn max_bytes(&self, category: AssetCategory) -> usize {
        match category {
            AssetCategory::Videos => self.max_video_bytes,
            _ => self.max_image_bytes,
        }
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_image_bytes: 2 * 1024 * 1024,
            max_video_bytes: 200 * 1024 * 1024,
        }
    }
}

/// Reasons an upload is refused before any network call
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Unsupported file format {content_type}: {category} must be {allowed}")]
    UnsupportedFormat {
        category: &'static str,
        content_type: String,
        allowed: &'static str,
    },

    #[error("File too large: {size} bytes exceeds the {max_bytes} byte limit")]
    TooLarge { size: usize, max_bytes: usize },

    #[error("File is empty")]
    Empty,
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Check format only; used before streaming a multipart body
pub fn validate_format(category: AssetCategory, content_type: &str) -> Result<(), UploadError> {
    if category.accepts(content_type) {
        Ok(())
    } else {
        Err(UploadError::UnsupportedFormat {
            category: category.as_str(),
            content_type: content_type.to_string(),
            allowed: category.allowed_description(),
        })
    }
}

/// Check size only
pub fn validate_size(
    category: AssetCategory,
    size: usize,
    limits: &UploadLimits,
) -> Result<(), UploadError> {
    let max_bytes = limits.max_bytes(category);
    if size == 0 {
        return Err(UploadError::Empty);
    }
    if size > max_bytes {
        return Err(UploadError::TooLarge { size, max_bytes });
    }
    Ok(())
}

/// Full pre-upload validation
pub fn validate(
    category: AssetCategory,
    content_type: &str,
    size: usize,
    limits: &UploadLimits,
) -> Result<(), UploadError> {
    validate_format(category, content_type)?;
    validate_size(category, size, limits)
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        _ => "bin",
    }
}

/// Object key: `{owner}/{category}/{sub_id}-{ulid}.{ext}`
///
/// The ULID keeps replaced assets from colliding with cached copies.
pub fn object_key(
    owner_id: &str,
    category: AssetCategory,
    sub_id: &str,
    content_type: &str,
) -> String {
    format!(
        "{}/{}/{}-{}.{}",
        owner_id,
        category.as_str(),
        sub_id,
        EntityId::new().0,
        extension_for(content_type)
    )
}
