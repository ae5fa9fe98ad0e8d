use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::auth::AdminSession;
use crate::error::{ApiError, ApiResult};
use crate::extract::Json;
use crate::media::UploadedImage;
use crate::AppState;

const DEFAULT_FOLDER: &str = "products";

fn image_source(file: &str) -> Result<(), ValidationError> {
    let ok = file.starts_with("data:image/") || file.starts_with("https://") || file.starts_with("http://");
    if ok { Ok(()) } else { Err(ValidationError::new("image_source")) }
}

fn folder_name(folder: &str) -> Result<(), ValidationError> {
    let ok = !folder.starts_with('/') && !folder.ends_with('/') && !folder.contains("//")
        && folder.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'));
    if ok { Ok(()) } else { Err(ValidationError::new("folder")) }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UploadRequest {
    /// Remote image URL or base64 `data:image/...` URI
    #[validate(length(min = 1), custom = "image_source")]
    pub file: String,
    #[validate(length(min = 1, max = 100), custom = "folder_name")]
    pub folder: Option<String>,
}

/// Uploads an image and returns its hosted URL for use in a product's `images`.
pub async fn upload_image(State(s): State<AppState>, AdminSession(admin): AdminSession, Json(r): Json<UploadRequest>) -> ApiResult<(StatusCode, Json<UploadedImage>)> {
    let media = s.media.as_ref().ok_or_else(|| ApiError::BadRequest("Image uploads are not enabled".into()))?;
    r.validate()?;
    let image = media.upload_image(&r.file, r.folder.as_deref().unwrap_or(DEFAULT_FOLDER)).await?;
    tracing::info!(admin_id = %admin.id, public_id = %image.public_id, "product image uploaded");
    Ok((StatusCode::CREATED, Json(image)))
}
