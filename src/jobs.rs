//! Job identity and the on-disk layout every component agrees on.
//!
//! ```text
//! <upload_dir>/file-<uuid>.mp4              staged upload
//! <upload_dir>/course/<job-id>/index.m3u8   playlist
//! <upload_dir>/course/<job-id>/segment000.ts
//! ```
//!
//! Paths are pure functions of the job id, so the listing and static
//! handlers can rebuild them without shared state.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

pub const COURSE_DIR: &str = "course";
pub const PLAYLIST_FILE: &str = "index.m3u8";
/// ffmpeg `-hls_segment_filename` template, numbering starts at 0.
pub const SEGMENT_TEMPLATE: &str = "segment%03d.ts";
/// Public mount point of the upload directory.
pub const URL_PREFIX: &str = "/uploads";

/// Identifier of a conversion job, also the name of its output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// A fresh random (v4) id. Never derived from the uploaded file.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Everything needed to run and locate one conversion.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub id: JobId,
    pub output_dir: PathBuf,
    pub playlist_path: PathBuf,
    pub segment_pattern: PathBuf,
}

#[derive(Debug, Clone)]
pub struct JobLayout {
    upload_dir: PathBuf,
}

impl JobLayout {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn course_dir(&self) -> PathBuf {
        self.upload_dir.join(COURSE_DIR)
    }

    pub fn job(&self, id: JobId) -> ConversionJob {
        let output_dir = self.course_dir().join(id.to_string());
        ConversionJob {
            id,
            playlist_path: output_dir.join(PLAYLIST_FILE),
            segment_pattern: output_dir.join(SEGMENT_TEMPLATE),
            output_dir,
        }
    }

    /// Create the staging and course directories if they are missing.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.course_dir()).await
    }
}

/// Server-relative playlist URL, as returned by the listing endpoint.
pub fn playlist_path_url(lesson_id: &str) -> String {
    format!("{}/{}/{}/{}", URL_PREFIX, COURSE_DIR, lesson_id, PLAYLIST_FILE)
}

/// Fully-qualified playlist URL, as returned after a conversion.
pub fn playlist_url(public_base_url: &str, id: JobId) -> String {
    format!(
        "{}{}",
        public_base_url.trim_end_matches('/'),
        playlist_path_url(&id.to_string())
    )
}
