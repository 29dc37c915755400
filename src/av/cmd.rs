use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tokio::process::Command as TokioCommand;

/// Runs the external transcoder with a ready-made argument vector.
///
/// Arguments are passed straight to the process, never through a shell.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscodeExecutor: Send + Sync {
    async fn run_ffmpeg(&self, args: Vec<OsString>) -> io::Result<Output>;
}

pub struct FfmpegExecutor {
    program: PathBuf,
}

impl FfmpegExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfmpegExecutor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl TranscodeExecutor for FfmpegExecutor {
    async fn run_ffmpeg(&self, args: Vec<OsString>) -> io::Result<Output> {
        TokioCommand::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // The caller bounds this future with a timeout; dropping it must not leave ffmpeg running.
            .kill_on_drop(true)
            .output()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_a_launch_error() {
        let executor = FfmpegExecutor::new("/nonexistent/ffmpeg-binary");
        let result = executor.run_ffmpeg(vec!["-version".into()]).await;

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
