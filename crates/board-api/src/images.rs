use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use uuid::Uuid;

use board_types::api::ImageUploadResponse;

use crate::error::ApiError;
use crate::state::AppState;

/// Accepted content types and the extension each is stored under.
const IMAGE_TYPES: [(&str, &str); 4] = [
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    IMAGE_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

/// Content type for a stored image name, or `None` if the name is not one we
/// could have issued. Only `<uuid>.<ext>` passes, so no path traversal.
fn content_type_for(name: &str) -> Option<&'static str> {
    let (stem, ext) = name.split_once('.')?;
    stem.parse::<Uuid>().ok()?;
    IMAGE_TYPES
        .iter()
        .find(|(_, known)| *known == ext)
        .map(|(mime, _)| *mime)
}

/// POST /api/image: raw image bytes, stored under the upload dir.
pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<Json<ImageUploadResponse>, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("image body is empty".into()));
    }

    if bytes.len() > state.max_image_bytes {
        return Err(ApiError::PayloadTooLarge(state.max_image_bytes));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let ext = extension_for(content_type).ok_or_else(|| {
        ApiError::BadRequest(format!("unsupported image type '{}'", content_type))
    })?;

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| {
            error!("Failed to create upload directory: {}", e);
            ApiError::Internal
        })?;

    let name = format!("{}.{}", Uuid::new_v4(), ext);
    let file_path = state.upload_dir.join(&name);
    let mut file = tokio::fs::File::create(&file_path).await.map_err(|e| {
        error!("Failed to create file {}: {}", file_path.display(), e);
        ApiError::Internal
    })?;
    file.write_all(&bytes).await.map_err(|e| {
        error!("Failed to write file {}: {}", file_path.display(), e);
        ApiError::Internal
    })?;

    info!(name = %name, size = bytes.len(), "Image stored");
    Ok(Json(ImageUploadResponse {
        image_url: format!("/api/image/{}", name),
    }))
}

/// GET /api/image/{name}
pub async fn get_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let not_found = || ApiError::NotFound(format!("image {} not found", name));
    let content_type = content_type_for(&name).ok_or_else(not_found)?;

    let file_path = state.upload_dir.join(&name);
    let bytes = tokio::fs::read(&file_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            not_found()
        } else {
            error!("Failed to read file {}: {}", file_path.display(), e);
            ApiError::Internal
        }
    })?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
