//! Out-of-process transcoding.

pub mod cmd;
pub mod transcode;

pub use cmd::{FfmpegExecutor, TranscodeExecutor};
pub use transcode::{hls_args, TranscodeError, Transcoder};
