//! Media format discriminator.

use serde::{Deserialize, Serialize};

/// Container/manifest format of the source, once known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoKind {
    /// Not yet determined, or a plain progressive file of unknown container.
    #[default]
    Default,
    /// HLS (M3U8 playlist of media segments).
    Hls,
    /// DASH (MPD manifest of media segments).
    Dash,
    Mp4,
    Webm,
    Audio,
}

impl VideoKind {
    /// Chunked-manifest formats: downloaded segment by segment and merged,
    /// so progress is tracked by segment counters rather than raw bytes.
    pub fn is_segmented(self) -> bool {
        matches!(self, VideoKind::Hls | VideoKind::Dash)
    }

    /// Best-effort classification from a Content-Type header value.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "application/vnd.apple.mpegurl" | "application/x-mpegurl" | "audio/mpegurl" => {
                VideoKind::Hls
            }
            "application/dash+xml" => VideoKind::Dash,
            "video/mp4" | "video/quicktime" => VideoKind::Mp4,
            "video/webm" => VideoKind::Webm,
            m if m.starts_with("audio/") => VideoKind::Audio,
            _ => VideoKind::Default,
        }
    }
}
