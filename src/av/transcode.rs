use super::cmd::TranscodeExecutor;
use crate::hls::{MediaPlaylist, PlaylistError};
use crate::jobs::ConversionJob;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Target segment length handed to the HLS muxer, in seconds.
pub const HLS_SEGMENT_SECONDS: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("failed to create output directory: {0}")]
    OutputDir(#[source] io::Error),
    #[error("failed to launch transcoder: {0}")]
    Launch(#[source] io::Error),
    #[error("transcoder exited with status {code:?}")]
    Exit { code: Option<i32>, stderr: String },
    #[error("transcoder did not finish within {0:?}")]
    Timeout(Duration),
    #[error("transcoder produced no usable playlist: {0}")]
    Playlist(#[from] PlaylistError),
}

/// ffmpeg arguments for a single-rendition VOD HLS conversion of `input`
/// into the job's output directory.
pub fn hls_args(input: &Path, job: &ConversionJob) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(18);
    args.push("-i".into());
    args.push(input.into());
    for flag in [
        ["-codec:v", "libx264"],
        ["-codec:a", "aac"],
        ["-hls_playlist_type", "vod"],
    ] {
        args.extend(flag.into_iter().map(OsString::from));
    }
    args.push("-hls_time".into());
    args.push(HLS_SEGMENT_SECONDS.to_string().into());
    args.push("-hls_segment_filename".into());
    args.push(job.segment_pattern.clone().into());
    args.push("-start_number".into());
    args.push("0".into());
    args.push(job.playlist_path.clone().into());
    args
}

#[derive(Clone)]
pub struct Transcoder {
    executor: Arc<dyn TranscodeExecutor>,
    timeout: Duration,
}

impl Transcoder {
    pub fn new(executor: Arc<dyn TranscodeExecutor>, timeout: Duration) -> Self {
        Self { executor, timeout }
    }

    /// Convert `input` into `job`'s output directory and return the parsed playlist.
    ///
    /// Waits for the process to exit. Only an exit status of 0 followed by a
    /// readable playlist counts as success.
    pub async fn run(
        &self,
        input: &Path,
        job: &ConversionJob,
    ) -> Result<MediaPlaylist, TranscodeError> {
        tokio::fs::create_dir_all(&job.output_dir)
            .await
            .map_err(TranscodeError::OutputDir)?;

        info!("Transcoding {:?} into {:?}", input, job.playlist_path);

        let run = self.executor.run_ffmpeg(hls_args(input, job));
        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!("Failed to launch transcoder for job {}: {}", job.id, e);
                return Err(TranscodeError::Launch(e));
            }
            Err(_) => {
                error!("Transcoder for job {} timed out after {:?}", job.id, self.timeout);
                return Err(TranscodeError::Timeout(self.timeout));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            error!(
                "Transcoder for job {} failed with {}: {}",
                job.id, output.status, stderr
            );
            return Err(TranscodeError::Exit {
                code: output.status.code(),
                stderr,
            });
        }
        debug!("stdout: {}", String::from_utf8_lossy(&output.stdout));
        debug!("stderr: {}", stderr);

        let playlist = MediaPlaylist::read_from(&job.playlist_path).await?;
        info!(
            "Job {} produced {} segments ({:.1}s)",
            job.id,
            playlist.segments.len(),
            playlist.duration()
        );
        Ok(playlist)
    }
}
