//! Static files under `/uploads/**`.
//!
//! `ServeDir` guesses content types from the extension, and its guesses for
//! HLS playlists and MPEG-TS segments are not what strict players expect.

use super::AppState;
use crate::jobs::URL_PREFIX;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::path::Path;
use tower::ServiceExt;

/// Content type to force for `path`, or `None` to keep the inferred one.
pub fn content_type_override(path: &str) -> Option<&'static str> {
    let extension = Path::new(path).extension()?.to_str()?;
    if extension.eq_ignore_ascii_case("m3u8") {
        Some("application/vnd.apple.mpegurl")
    } else if extension.eq_ignore_ascii_case("ts") {
        Some("video/mp2t")
    } else if extension.eq_ignore_ascii_case("mov") {
        Some("video/quicktime")
    } else {
        None
    }
}

pub async fn serve_upload(State(state): State<AppState>, mut request: Request) -> Response {
    let path = request.uri().path().to_owned();
    let relative = path.strip_prefix(URL_PREFIX).unwrap_or(&path);
    match relative.parse::<Uri>() {
        Ok(uri) => *request.uri_mut() = uri,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    }

    let response = match state.assets.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let mut response = response.map(Body::new);
    if response.status().is_success() {
        if let Some(content_type) = content_type_override(&path) {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_override() {
        assert_eq!(
            content_type_override("/uploads/course/x/index.m3u8"),
            Some("application/vnd.apple.mpegurl")
        );
        assert_eq!(
            content_type_override("/uploads/course/x/segment000.ts"),
            Some("video/mp2t")
        );
        assert_eq!(
            content_type_override("/uploads/file-1.MOV"),
            Some("video/quicktime")
        );
        assert_eq!(content_type_override("/uploads/file-1.mp4"), None);
        assert_eq!(content_type_override("/uploads/course"), None);
    }
}
