//! Upload-to-HLS conversion: name the job, run the transcoder, report.

use crate::av::{TranscodeError, Transcoder};
use crate::config::UploadRetention;
use crate::jobs::{playlist_url, JobId, JobLayout};
use crate::upload::StagedUpload;
use serde::Serialize;
use tracing::{info, warn};

pub const SUCCESS_MESSAGE: &str = "Video converted to HLS format";

/// Body of a successful `POST /upload`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    pub message: String,
    pub video_url: String,
    pub lesson_id: JobId,
}

#[derive(Clone)]
pub struct Converter {
    layout: JobLayout,
    transcoder: Transcoder,
    public_base_url: String,
    retention: UploadRetention,
    keep_failed_jobs: bool,
}

impl Converter {
    pub fn new(
        layout: JobLayout,
        transcoder: Transcoder,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            layout,
            transcoder,
            public_base_url: public_base_url.into(),
            retention: UploadRetention::Keep,
            keep_failed_jobs: true,
        }
    }

    pub fn with_retention(mut self, retention: UploadRetention, keep_failed_jobs: bool) -> Self {
        self.retention = retention;
        self.keep_failed_jobs = keep_failed_jobs;
        self
    }

    pub fn layout(&self) -> &JobLayout {
        &self.layout
    }

    /// Convert a staged upload. A fresh job id is drawn for every call.
    pub async fn convert(&self, upload: &StagedUpload) -> Result<ConversionReport, TranscodeError> {
        let job = self.layout.job(JobId::new());
        info!("Job {} started for {:?}", job.id, upload.original_name);

        let result = self.transcoder.run(&upload.path, &job).await;

        if self.retention == UploadRetention::Delete {
            if let Err(e) = tokio::fs::remove_file(&upload.path).await {
                warn!("Failed to remove staged upload {:?}: {}", upload.path, e);
            }
        }

        match result {
            Ok(_) => {
                let video_url = playlist_url(&self.public_base_url, job.id);
                info!("Job {} finished: {}", job.id, video_url);
                Ok(ConversionReport {
                    message: SUCCESS_MESSAGE.to_string(),
                    video_url,
                    lesson_id: job.id,
                })
            }
            Err(e) => {
                if !self.keep_failed_jobs {
                    if let Err(rm) = tokio::fs::remove_dir_all(&job.output_dir).await {
                        warn!("Failed to remove output of job {}: {}", job.id, rm);
                    }
                }
                Err(e)
            }
        }
    }
}
