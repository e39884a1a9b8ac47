//! Upload Routes
//!
//! Endpoints:
//! - POST /upload - multipart upload (field `file`), returns OCR results

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::upload::{UploadJob, UploadResult};

/// Multipart field carrying the document
const FILE_FIELD: &str = "file";

/// Create the upload router, accepting bodies up to `max_upload_bytes`
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .route("/upload/", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// POST /upload
///
/// Run OCR on an uploaded image or PDF. Images produce a flattened
/// single-page result; PDFs produce a `pages` array.
async fn upload(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResult>> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Upload without multipart body: {}", e);
        no_file()
    })?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // A field without a file name is a plain form value, not a file
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field.bytes().await?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) = upload.ok_or_else(no_file)?;

    tracing::info!(
        file_name = %file_name,
        size = data.len(),
        "Upload received"
    );

    let result = state
        .pipeline()
        .run(UploadJob::new(file_name, data.to_vec()))
        .await?;

    Ok(Json(result))
}

fn no_file() -> AppError {
    AppError::BadRequest("No file uploaded".to_string())
}
