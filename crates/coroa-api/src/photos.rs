use axum::{
    Extension, Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info};
use uuid::Uuid;

use coroa_db::models::PhotoRow;
use coroa_types::api::{Claims, PhotoUploadResponse};

use crate::auth::{AppState, blocking};
use crate::error::ApiError;

/// 5 MiB per photo
pub const MAX_PHOTO_SIZE: usize = 5 * 1024 * 1024;

/// Photos a single user may keep.
const MAX_PHOTOS_PER_USER: i64 = 6;

const PHOTO_FIELD: &str = "photo";

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(format!("photo exceeds {} bytes", MAX_PHOTO_SIZE))
        } else {
            ApiError::bad_request(e.body_text())
        }
    }
}

/// POST /api/users/me/photos: multipart with a single `photo` field.
/// Stores `{upload_dir}/{user_id}/{photo_id}.{ext}` and appends its URL to the profile.
pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_ascii_lowercase();
        let ext = extension_for(&content_type).ok_or_else(|| {
            ApiError::UnsupportedMediaType(format!("unsupported photo type '{}'", content_type))
        })?;
        let bytes = field.bytes().await?;
        upload = Some((content_type, ext, bytes));
        break;
    }

    let (content_type, ext, bytes) =
        upload.ok_or_else(|| ApiError::bad_request("missing 'photo' field"))?;

    if bytes.is_empty() {
        return Err(ApiError::bad_request("photo is empty"));
    }
    if bytes.len() > MAX_PHOTO_SIZE {
        return Err(ApiError::PayloadTooLarge(format!("photo exceeds {} bytes", MAX_PHOTO_SIZE)));
    }

    let user_id = claims.sub;
    let uid = user_id.to_string();
    let existing = blocking(&state, move |s| s.db.count_photos(&uid)).await?;
    if existing >= MAX_PHOTOS_PER_USER {
        return Err(ApiError::bad_request(format!("at most {} photos", MAX_PHOTOS_PER_USER)));
    }

    let photo_id = Uuid::new_v4();
    let relative = format!("{}/{}.{}", user_id, photo_id, ext);
    let user_dir = state.settings.upload_dir.join(user_id.to_string());

    tokio::fs::create_dir_all(&user_dir).await.map_err(|e| {
        error!("Failed to create upload directory {}: {}", user_dir.display(), e);
        ApiError::Internal(e.into())
    })?;

    let file_path = state.settings.upload_dir.join(&relative);
    tokio::fs::write(&file_path, &bytes).await.map_err(|e| {
        error!("Failed to write photo {}: {}", file_path.display(), e);
        ApiError::Internal(e.into())
    })?;

    let url = format!(
        "{}/uploads/{}",
        state.settings.public_url.trim_end_matches('/'),
        relative
    );

    let row = PhotoRow {
        id: photo_id.to_string(),
        user_id: user_id.to_string(),
        path: relative,
        content_type,
        size: bytes.len() as i64,
    };
    let photo_url = url.clone();
    if let Err(e) = blocking(&state, move |s| s.db.add_photo(&row, &photo_url)).await {
        // Drop the orphaned file.
        let _ = tokio::fs::remove_file(&file_path).await;
        return Err(e);
    }

    info!("User {} uploaded photo {} ({} bytes)", user_id, photo_id, bytes.len());

    Ok((StatusCode::CREATED, Json(PhotoUploadResponse { url })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_images_are_accepted() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("image/webp"), Some("webp"));
        assert_eq!(extension_for("application/pdf"), None);
        assert_eq!(extension_for(""), None);
    }
}
