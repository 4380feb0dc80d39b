//! Media probing via `ffprobe`
//!
//! Supplies the metadata used to synthesize matching stand-in assets, and
//! the integrity check applied to outputs a candidate script produced.

use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

/// Type-relevant metadata of a media asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaMetadata {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Duration in seconds
    pub duration: f64,
    /// Frames per second
    pub frame_rate: f64,
}

impl Default for MediaMetadata {
    fn default() -> Self {
        // Matches the generic placeholder the reference sandbox falls back to.
        Self {
            width: 640,
            height: 480,
            duration: 5.0,
            frame_rate: 24.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// File extensions treated as video media for stand-in synthesis.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv"];

/// Whether a filename denotes a video asset (by extension).
#[must_use]
pub fn is_video_filename(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// Probe a media file's metadata. Returns `None` when the file cannot be
/// probed (missing, unreadable, or no video stream).
pub async fn probe_media(path: &Path) -> Option<MediaMetadata> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        tracing::warn!(path = %path.display(), "ffprobe failed");
        return None;
    }

    let report: ProbeReport = serde_json::from_slice(&output.stdout).ok()?;
    let video = report
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))?;

    let stream_duration = video.duration.as_deref().and_then(|d| d.parse().ok());
    let format_duration = report
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse().ok());

    Some(MediaMetadata {
        width: video.width?,
        height: video.height?,
        duration: format_duration.or(stream_duration).unwrap_or(0.0),
        frame_rate: video
            .r_frame_rate
            .as_deref()
            .and_then(parse_rate)
            .unwrap_or(0.0),
    })
}

/// Whether a media file is structurally readable by ffprobe.
pub async fn is_media_readable(path: &Path) -> bool {
    let result = Command::new("ffprobe")
        .args(["-v", "error", "-show_entries", "stream=codec_type"])
        .arg(path)
        .output()
        .await;
    matches!(result, Ok(out) if out.status.success())
}

/// Parse an ffprobe rational rate string such as `"30000/1001"` or `"25"`.
fn parse_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => rate.trim().parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_parses_fraction() {
        assert_eq!(parse_rate("30/1"), Some(30.0));
        let ntsc = parse_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
    }

    #[test]
    fn rate_parses_plain_number() {
        assert_eq!(parse_rate("25"), Some(25.0));
    }

    #[test]
    fn rate_rejects_zero_denominator() {
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("nonsense"), None);
    }

    #[test]
    fn video_extension_detection() {
        assert!(is_video_filename("proxy3.mp4"));
        assert!(is_video_filename("CLIP.MOV"));
        assert!(!is_video_filename("metadata.json"));
        assert!(!is_video_filename("no_extension"));
    }

    #[tokio::test]
    async fn probe_of_missing_file_is_none() {
        assert!(probe_media(Path::new("/no/such/file.mp4")).await.is_none());
    }

    #[tokio::test]
    async fn unreadable_file_fails_integrity_check() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake.mp4");
        std::fs::write(&fake, b"not a video").unwrap();
        // Holds whether or not ffprobe is installed: a spawn failure also
        // reports unreadable.
        assert!(!is_media_readable(&fake).await);
    }
}
