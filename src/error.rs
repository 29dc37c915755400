//! HTTP-facing error type. Every handler returns `Result<_, AppError>`, so
//! each request gets exactly one response.

use crate::av::TranscodeError;
use crate::listing::ListingError;
use crate::upload::UploadError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

const CONVERSION_FAILED: &str = "Error converting video to HLS format";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
    #[error(transparent)]
    Listing(#[from] ListingError),
    #[error("conversion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Upload(UploadError::Missing | UploadError::MultipleFiles) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Upload(UploadError::Multipart(e)) => e.status(),
            AppError::Upload(UploadError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Transcode(_) | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Listing(ListingError::Empty) => StatusCode::NOT_FOUND,
            AppError::Listing(ListingError::Unreadable { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Upload(UploadError::Io(e)) => {
                error!("Failed to stage upload: {}", e);
                json!({ "message": "Unable to store upload" })
            }
            AppError::Upload(UploadError::Multipart(e)) => json!({ "message": e.body_text() }),
            AppError::Upload(UploadError::TooLarge { .. }) => json!({ "message": "File too large" }),
            AppError::Upload(e) => json!({ "message": e.to_string() }),
            // Transcoder output stays in the logs.
            AppError::Transcode(_) => json!({ "message": CONVERSION_FAILED }),
            AppError::Task(e) => {
                error!("Conversion task failed: {}", e);
                json!({ "message": CONVERSION_FAILED })
            }
            AppError::Listing(ListingError::Empty) => json!({ "message": "No lessons found" }),
            AppError::Listing(e @ ListingError::Unreadable { .. }) => {
                error!("{}", e);
                json!({ "message": "Unable to scan directory", "error": e.to_string() })
            }
        };

        (status, Json(body)).into_response()
    }
}
