//! Configuration loaded from the environment (and an optional `.env` file).

use std::env;
use std::num::NonZeroU64;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// 100 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// What happens to the staged upload once its conversion has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum UploadRetention {
    /// Leave the staged file in the upload directory.
    #[default]
    Keep,
    /// Remove the staged file after the transcoder exits, success or not.
    Delete,
}

impl FromStr for UploadRetention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown upload retention policy '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// HTTP server bind address
    pub host: String,
    /// First port to try
    pub port: u16,
    /// How many following ports to try when `port` is already taken
    pub port_retries: u16,
    /// Staging directory for uploads; HLS output lives under `<upload_dir>/course`
    pub upload_dir: PathBuf,
    /// Prefix of the `videoUrl` handed back to clients
    pub public_base_url: String,
    pub max_upload_bytes: u64,
    pub ffmpeg_path: PathBuf,
    pub transcode_timeout: Duration,
    /// Origins allowed by the CORS layer (credentials are allowed for these)
    pub allowed_origins: Vec<String>,
    pub upload_retention: UploadRetention,
    pub keep_failed_jobs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8000,
            port_retries: 1,
            upload_dir: PathBuf::from("uploads"),
            public_base_url: String::from("http://localhost:3000"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            transcode_timeout: Duration::from_secs(3600),
            allowed_origins: vec![
                String::from("http://localhost:3000"),
                String::from("http://localhost:8000"),
            ],
            upload_retention: UploadRetention::Keep,
            keep_failed_jobs: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port),
            port_retries: parse_var("PORT_RETRIES", defaults.port_retries),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            public_base_url: env::var("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            ffmpeg_path: env::var("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_path),
            transcode_timeout: parse_timeout(
                "TRANSCODE_TIMEOUT_SECS",
                env::var("TRANSCODE_TIMEOUT_SECS").ok(),
                defaults.transcode_timeout,
            ),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|raw| split_origins(&raw))
                .unwrap_or(defaults.allowed_origins),
            upload_retention: parse_var("UPLOAD_RETENTION", defaults.upload_retention),
            keep_failed_jobs: parse_var("KEEP_FAILED_JOBS", defaults.keep_failed_jobs),
        }
    }
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_raw(key, env::var(key).ok(), default)
}

fn parse_raw<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Ignoring invalid {}={:?}: {}", key, raw, e);
            default
        }),
        None => default,
    }
}

/// Whole seconds, never zero.
fn parse_timeout(key: &str, raw: Option<String>, default: Duration) -> Duration {
    match NonZeroU64::new(default.as_secs()) {
        Some(secs) => Duration::from_secs(parse_raw(key, raw, secs).get()),
        None => default,
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
