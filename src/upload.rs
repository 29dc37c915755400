//! Receiving the uploaded video and staging it on disk.

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::BoxError;
use futures::{Stream, TryStreamExt};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::{fs::File, io::BufWriter};
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Name of the multipart field carrying the video.
pub const FILE_FIELD: &str = "file";

const MAX_EXTENSION_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub path: PathBuf,
    /// Client-supplied name, only used for logging and the extension.
    pub original_name: String,
    pub size: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    Missing,
    #[error("Only one file may be uploaded")]
    MultipleFiles,
    #[error("File too large (limit is {limit} bytes)")]
    TooLarge { limit: u64 },
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("failed to store upload: {0}")]
    Io(#[from] io::Error),
}

/// `{field}-{uuid}{.ext}`, where `.ext` comes from the client's file name
/// and is dropped unless it is a short alphanumeric extension.
pub fn staged_file_name(field: &str, original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    format!("{}-{}{}", field, Uuid::new_v4(), extension)
}

/// Pull the single `file` field out of `multipart` and write it into `staging_dir`.
pub async fn receive(
    multipart: &mut Multipart,
    staging_dir: &Path,
    max_bytes: u64,
) -> Result<StagedUpload, UploadError> {
    let mut staged: Option<StagedUpload> = None;
    let outcome = collect_file(multipart, staging_dir, max_bytes, &mut staged).await;

    match (outcome, staged) {
        (Ok(()), Some(upload)) => {
            info!(
                "Staged {:?} ({} bytes) as {:?}",
                upload.original_name, upload.size, upload.path
            );
            Ok(upload)
        }
        (Ok(()), None) => Err(UploadError::Missing),
        (Err(e), Some(upload)) => {
            discard(&upload.path).await;
            Err(e)
        }
        (Err(e), None) => Err(e),
    }
}

async fn collect_file(
    multipart: &mut Multipart,
    staging_dir: &Path,
    max_bytes: u64,
    staged: &mut Option<StagedUpload>,
) -> Result<(), UploadError> {
    while let Some(field) = multipart.next_field().await? {
        let original_name = match field.file_name() {
            Some(name) => name.to_owned(),
            None => continue,
        };
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping unexpected file field {:?}", field.name());
            continue;
        }
        if staged.is_some() {
            return Err(UploadError::MultipleFiles);
        }

        tokio::fs::create_dir_all(staging_dir).await?;
        let path = staging_dir.join(staged_file_name(FILE_FIELD, &original_name));
        let size = stream_to_file(&path, field, max_bytes).await?;

        *staged = Some(StagedUpload {
            path,
            original_name,
            size,
        });
    }
    Ok(())
}

/// Save a `Stream` to a file, refusing anything larger than `max_bytes`.
///
/// The partially written file is removed on failure.
pub async fn stream_to_file<S, E>(path: &Path, stream: S, max_bytes: u64) -> Result<u64, UploadError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    let written = async {
        let body_with_io_error = stream.map_err(|err| io::Error::new(io::ErrorKind::Other, err));
        let body_reader = StreamReader::new(body_with_io_error);
        futures::pin_mut!(body_reader);

        // One byte past the limit is enough to know the upload is too big.
        let mut limited = body_reader.take(max_bytes.saturating_add(1));
        let mut file = BufWriter::new(File::create(path).await?);
        let written = tokio::io::copy(&mut limited, &mut file).await?;
        file.flush().await?;

        Ok::<_, io::Error>(written)
    }
    .await;

    match written {
        Ok(written) if written > max_bytes => {
            warn!("Rejecting upload {:?}: more than {} bytes", path, max_bytes);
            discard(path).await;
            Err(UploadError::TooLarge { limit: max_bytes })
        }
        Ok(written) => Ok(written),
        Err(e) => {
            discard(path).await;
            Err(stream_error(e))
        }
    }
}

/// Errors from the multipart field itself are the client's fault and keep
/// their own status. Everything else is a local storage failure.
fn stream_error(e: io::Error) -> UploadError {
    if !e.get_ref().is_some_and(|inner| inner.is::<MultipartError>()) {
        return UploadError::Io(e);
    }

    let kind = e.kind();
    match e.into_inner().map(|inner| inner.downcast::<MultipartError>()) {
        Some(Ok(multipart)) => UploadError::Multipart(*multipart),
        Some(Err(inner)) => UploadError::Io(io::Error::new(kind, inner)),
        None => UploadError::Io(kind.into()),
    }
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{header, Request};
    use futures::stream;
    use std::fs;
    use tempfile::tempdir;

    const BOUNDARY: &str = "X-TEST-BOUNDARY";

    async fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Multipart {
        let mut body = Vec::new();
        for (name, file_name, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::post("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    fn staged_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.is_file())
            .collect()
    }

    #[test]
    fn test_staged_file_name_keeps_extension() {
        let name = staged_file_name("file", "holiday clip.MP4");
        assert!(name.starts_with("file-"));
        assert!(name.ends_with(".MP4"));

        let token = &name["file-".len()..name.len() - ".MP4".len()];
        assert!(Uuid::parse_str(token).is_ok());
    }

    #[test]
    fn test_staged_file_name_drops_suspicious_extension() {
        assert!(!staged_file_name("file", "clip.m p4").contains(' '));
        assert!(!staged_file_name("file", "../../etc/passwd").contains('/'));
        assert_eq!(staged_file_name("file", "noext").len(), "file-".len() + 36);
    }

    #[test]
    fn test_staged_file_names_are_unique() {
        assert_ne!(
            staged_file_name("file", "a.mp4"),
            staged_file_name("file", "a.mp4")
        );
    }

    #[tokio::test]
    async fn test_stream_to_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test_file.txt");

        type E = std::io::Error;

        let test_data = "Hello, world!";
        let mock_stream = stream::iter(vec![Ok::<Bytes, E>(Bytes::from(test_data))]);

        let result = stream_to_file(&file_path, mock_stream, 1024).await;

        assert_eq!(result.unwrap(), test_data.len() as u64);
        let file_contents = fs::read_to_string(file_path).unwrap();
        assert_eq!(file_contents, test_data);
    }

    #[tokio::test]
    async fn test_stream_to_file_error() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test_file.txt");

        let mock_stream = stream::iter(vec![Err::<Bytes, _>("Test error")]);

        let result = stream_to_file(&file_path, mock_stream, 1024).await;

        match result {
            Err(UploadError::Io(e)) => assert_eq!(e.to_string(), "Test error"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!file_path.exists());
    }

    #[tokio::test]
    async fn test_stream_to_file_exact_limit_is_accepted() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("exact.bin");

        let mock_stream = stream::iter(vec![Ok::<Bytes, io::Error>(Bytes::from(vec![7u8; 16]))]);

        let result = stream_to_file(&file_path, mock_stream, 16).await;
        assert_eq!(result.unwrap(), 16);
    }

    #[tokio::test]
    async fn test_stream_to_file_too_large() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("big.bin");

        let chunks = vec![
            Ok::<Bytes, io::Error>(Bytes::from(vec![0u8; 10])),
            Ok(Bytes::from(vec![0u8; 10])),
        ];

        let result = stream_to_file(&file_path, stream::iter(chunks), 16).await;

        assert!(matches!(result, Err(UploadError::TooLarge { limit: 16 })));
        assert!(!file_path.exists());
    }

    #[tokio::test]
    async fn test_receive_stages_file_field() {
        let temp_dir = tempdir().unwrap();
        let staging = temp_dir.path().join("uploads");
        let mut form = multipart(&[
            ("title", None, &b"Lesson 1"[..]),
            ("file", Some("lesson.mov"), &b"not really a movie"[..]),
        ])
        .await;

        let staged = receive(&mut form, &staging, 1024).await.unwrap();

        assert_eq!(staged.original_name, "lesson.mov");
        assert_eq!(staged.size, 18);
        assert_eq!(staged.path.parent().unwrap(), staging);
        assert_eq!(staged.path.extension().unwrap(), "mov");
        assert_eq!(fs::read(&staged.path).unwrap(), b"not really a movie");
    }

    #[tokio::test]
    async fn test_receive_without_file_is_missing() {
        let temp_dir = tempdir().unwrap();
        let mut form = multipart(&[("title", None, &b"Lesson 1"[..])]).await;

        let result = receive(&mut form, temp_dir.path(), 1024).await;

        assert!(matches!(result, Err(UploadError::Missing)));
        assert!(staged_files(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_receive_rejects_second_file() {
        let temp_dir = tempdir().unwrap();
        let mut form = multipart(&[
            ("file", Some("a.mp4"), &b"aaaa"[..]),
            ("file", Some("b.mp4"), &b"bbbb"[..]),
        ])
        .await;

        let result = receive(&mut form, temp_dir.path(), 1024).await;

        assert!(matches!(result, Err(UploadError::MultipleFiles)));
        assert!(staged_files(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_receive_truncated_body_is_client_error() {
        let temp_dir = tempdir().unwrap();
        let body = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.mp4\"\r\n\r\npartial bytes",
            BOUNDARY
        );
        let request = Request::post("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        let mut form = Multipart::from_request(request, &()).await.unwrap();

        let result = receive(&mut form, temp_dir.path(), 1024).await;

        match result {
            Err(UploadError::Multipart(e)) => assert!(e.status().is_client_error()),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(staged_files(temp_dir.path()).is_empty());
    }
}
