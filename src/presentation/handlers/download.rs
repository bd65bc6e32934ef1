use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use super::api_response::ApiError;
use crate::application::ports::MediaStoreError;
use crate::presentation::state::AppState;

fn content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "flv" => "video/x-flv",
        "gif" => "image/gif",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

#[tracing::instrument(skip(state))]
pub async fn download_handler(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, ApiError> {
    let stream = state.media_store.open(&file_name).await.map_err(|e| match e {
        MediaStoreError::InvalidName(_) => ApiError::bad_request(e.to_string()),
        MediaStoreError::NotFound(_) => ApiError::not_found(format!("File not found: {file_name}")),
        other => {
            tracing::error!(error = %other, "Failed to read media file");
            ApiError::internal(other.to_string())
        }
    })?;

    tracing::info!("Streaming media file");
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type(&file_name).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
