use super::AppState;
use crate::error::AppError;
use crate::listing;
use crate::upload::{self, UploadError};
use crate::workflow::ConversionReport;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use tracing::debug;

pub(super) async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello World!" }))
}

pub(super) async fn list_uploads(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let urls = listing::lesson_urls(state.converter.layout()).await?;
    Ok(Json(json!({ "urls": urls })))
}

/// Stage the uploaded file, then convert it and wait for the transcoder.
pub(super) async fn upload_media(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConversionReport>, AppError> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!("Not a multipart upload: {}", rejection);
        UploadError::Missing
    })?;

    let staged = upload::receive(
        &mut multipart,
        state.converter.layout().staging_dir(),
        state.max_upload_bytes,
    )
    .await?;

    // Detached from the connection: a client hanging up does not kill the transcoder.
    let converter = state.converter.clone();
    let report = tokio::spawn(async move { converter.convert(&staged).await }).await??;

    Ok(Json(report))
}
