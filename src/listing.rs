//! Enumerating finished (or in-progress) jobs from the course directory.
//!
//! A job is listed as soon as its directory exists, so a listed playlist
//! may still be missing or incomplete.

use crate::jobs::{playlist_path_url, JobLayout};
use std::io;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("unable to scan {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no lessons found")]
    Empty,
}

/// Names of the job directories under `course/`, sorted.
pub async fn list_lessons(layout: &JobLayout) -> Result<Vec<String>, ListingError> {
    let course_dir = layout.course_dir();
    let unreadable = |source| ListingError::Unreadable {
        path: course_dir.clone(),
        source,
    };

    let mut entries = tokio::fs::read_dir(&course_dir).await.map_err(unreadable)?;
    let mut lessons = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        match entry.file_type().await {
            Ok(file_type) if file_type.is_dir() => match entry.file_name().into_string() {
                Ok(name) => lessons.push(name),
                Err(name) => debug!("Skipping non UTF-8 directory {:?}", name),
            },
            Ok(_) => {}
            Err(e) => debug!("Skipping {:?}: {}", entry.path(), e),
        }
    }

    if lessons.is_empty() {
        return Err(ListingError::Empty);
    }

    lessons.sort();
    Ok(lessons)
}

/// Playlist URLs for every listed job.
pub async fn lesson_urls(layout: &JobLayout) -> Result<Vec<String>, ListingError> {
    let lessons = list_lessons(layout).await?;
    Ok(lessons.iter().map(|id| playlist_path_url(id)).collect())
}
