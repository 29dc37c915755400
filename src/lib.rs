//! hlsdrop - upload a video, get an HLS stream back.
//!
//! - config: Environment configuration
//! - jobs: Job ids and the on-disk layout
//! - upload: Multipart upload staging
//! - av: External transcoder invocation
//! - hls: Playlist model
//! - workflow: Upload-to-HLS conversion and result reporting
//! - listing: Job enumeration
//! - server: HTTP routes, static files, startup
//!
//! Everything is coordinated through the filesystem: a job exists once its
//! directory under `<upload_dir>/course` exists.

pub mod av;
pub mod config;
pub mod error;
pub mod hls;
pub mod jobs;
pub mod listing;
pub mod server;
pub mod upload;
pub mod workflow;

// Re-exports for convenience
pub use config::Config;
pub use error::AppError;
pub use jobs::{JobId, JobLayout};
pub use server::{create_router, AppState};
