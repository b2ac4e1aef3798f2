//! Multipart upload extraction
//!
//! Reads the `file` part with the category's size ceiling enforced while
//! streaming, so oversized bodies are refused before they are buffered.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::AppError;
use crate::service::UploadedFile;
use crate::storage::upload::{UploadError, validate_format, validate_size};
use crate::storage::{AssetCategory, UploadLimits};

/// The uploaded file plus any plain text fields sent alongside it
pub struct MultipartUpload {
    pub file: UploadedFile,
    pub fields: HashMap<String, String>,
}

pub async fn read_upload(
    mut multipart: Multipart,
    category: AssetCategory,
    limits: &UploadLimits,
) -> Result<MultipartUpload, AppError> {
    let max_size = limits.max_bytes(category);
    let mut file: Option<UploadedFile> = None;
    let mut fields = HashMap::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to parse multipart: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        if field_name == "file" {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .ok_or(AppError::Validation(
                    "Missing content type for uploaded file".to_string(),
                ))?;
            validate_format(category, &content_type)?;

            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read file: {}", e)))?
            {
                if bytes.len() + chunk.len() > max_size {
                    return Err(UploadError::TooLarge {
                        size: bytes.len() + chunk.len(),
                        max_bytes: max_size,
                    }
                    .into());
                }
                bytes.extend_from_slice(&chunk);
            }
            validate_size(category, bytes.len(), limits)?;

            file = Some(UploadedFile {
                content_type,
                data: bytes,
            });
        } else if !field_name.is_empty() {
            let value = field.text().await.map_err(|e| {
                AppError::Validation(format!("Failed to read field {}: {}", field_name, e))
            })?;
            fields.insert(field_name, value);
        }
    }

    let file = file.ok_or(AppError::Validation("No file provided".to_string()))?;
    Ok(MultipartUpload { file, fields })
}
