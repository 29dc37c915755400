use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static EXTINF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#EXTINF:(\d+(?:\.\d+)?),").expect("valid EXTINF regex"));
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#EXT-X-([A-Z-]+)(?::(.*))?$").expect("valid tag regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct MediaSegment {
    pub duration: f64,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaPlaylist {
    pub version: u8,
    pub target_duration: u64,
    pub media_sequence: u64,
    pub segments: Vec<MediaSegment>,
    pub end_list: bool,
    pub playlist_type: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    #[error("failed to read playlist: {0}")]
    Io(#[from] std::io::Error),
    #[error("not an HLS playlist (missing #EXTM3U header)")]
    MissingHeader,
    #[error("invalid value for {tag}: {value}")]
    InvalidTag { tag: String, value: String },
}

impl MediaPlaylist {
    pub fn new(target_duration: u64) -> Self {
        Self {
            version: 3,
            target_duration,
            media_sequence: 0,
            segments: Vec::new(),
            end_list: true,
            playlist_type: None,
        }
    }

    pub fn add_segment(&mut self, duration: f64, uri: String) {
        self.segments.push(MediaSegment { duration, uri });
    }

    /// Total duration in seconds, summed over `#EXTINF` entries.
    pub fn duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Parse a media playlist as written by ffmpeg's HLS muxer.
    ///
    /// Unknown tags are ignored. A URI line without a preceding
    /// `#EXTINF` is recorded with a zero duration.
    pub fn parse(content: &str) -> Result<Self, PlaylistError> {
        let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());

        if lines.next() != Some("#EXTM3U") {
            return Err(PlaylistError::MissingHeader);
        }

        let mut playlist = MediaPlaylist::new(0);
        playlist.end_list = false;
        let mut pending_duration: Option<f64> = None;

        for line in lines {
            if let Some(caps) = EXTINF.captures(line) {
                pending_duration = Some(parse_value("EXTINF", &caps[1])?);
            } else if let Some(caps) = TAG.captures(line) {
                let value = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                match &caps[1] {
                    "VERSION" => playlist.version = parse_value("EXT-X-VERSION", value)?,
                    "TARGETDURATION" => {
                        playlist.target_duration = parse_value("EXT-X-TARGETDURATION", value)?
                    }
                    "MEDIA-SEQUENCE" => {
                        playlist.media_sequence = parse_value("EXT-X-MEDIA-SEQUENCE", value)?
                    }
                    "PLAYLIST-TYPE" => playlist.playlist_type = Some(value.to_string()),
                    "ENDLIST" => playlist.end_list = true,
                    _ => {}
                }
            } else if !line.starts_with('#') {
                playlist.add_segment(pending_duration.take().unwrap_or(0.0), line.to_string());
            }
        }

        Ok(playlist)
    }

    pub async fn read_from(path: &Path) -> Result<Self, PlaylistError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }
}

fn parse_value<T: std::str::FromStr>(tag: &str, value: &str) -> Result<T, PlaylistError> {
    value.trim().parse().map_err(|_| PlaylistError::InvalidTag {
        tag: tag.to_string(),
        value: value.to_string(),
    })
}
