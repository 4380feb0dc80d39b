//! Stand-in asset synthesis for sandbox validation
//!
//! A candidate script is exercised against synthetic inputs only. Video
//! inputs get a test-pattern asset whose resolution, duration, and frame
//! rate mirror the probed metadata of the real input; everything else gets
//! an empty placeholder. All files created here are tracked so the caller
//! can remove them regardless of the validation outcome.

use crate::error::SandboxSetupError;
use crate::probe::MediaMetadata;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Stand-in files created inside a sandbox, removed via [`StandIns::cleanup`].
#[derive(Debug, Default)]
pub struct StandIns {
    files: Vec<PathBuf>,
}

impl StandIns {
    /// Create an empty tracker.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a file for later removal.
    pub fn track(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    /// Number of tracked stand-in files.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no stand-ins were created.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Remove every tracked file. Missing files are ignored; removal errors
    /// are logged and swallowed so cleanup never masks a verdict.
    pub fn cleanup(self) {
        for path in self.files {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove stand-in");
                }
            }
        }
    }
}

/// Synthesize a test-pattern video stand-in at `dir/filename` matching
/// `metadata`. Falls back to an empty placeholder when `ffmpeg` is
/// unavailable or fails, mirroring the degraded mode the rest of the
/// validator tolerates.
pub async fn create_stand_in_video(
    dir: &Path,
    filename: &str,
    metadata: &MediaMetadata,
) -> Result<PathBuf, SandboxSetupError> {
    let output_path = dir.join(filename);
    let size = format!("{}x{}", metadata.width.max(2), metadata.height.max(2));
    let rate = if metadata.frame_rate > 0.0 {
        metadata.frame_rate
    } else {
        24.0
    };
    let duration = if metadata.duration > 0.0 {
        metadata.duration
    } else {
        5.0
    };

    let result = Command::new("ffmpeg")
        .args(["-y", "-f", "lavfi", "-i"])
        .arg(format!(
            "testsrc=size={size}:rate={rate}:duration={duration}"
        ))
        .args(["-f", "lavfi", "-i"])
        .arg("anullsrc=channel_layout=stereo:sample_rate=44100")
        .args(["-c:v", "libx264", "-t"])
        .arg(duration.to_string())
        .args(["-pix_fmt", "yuv420p"])
        .arg(&output_path)
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => {
            tracing::debug!(path = %output_path.display(), ?metadata, "created stand-in video");
            Ok(output_path)
        }
        Ok(out) => {
            tracing::warn!(
                path = %output_path.display(),
                stderr = %String::from_utf8_lossy(&out.stderr),
                "ffmpeg stand-in synthesis failed, using empty placeholder"
            );
            create_placeholder(dir, filename)
        }
        Err(e) => {
            tracing::warn!(
                path = %output_path.display(),
                error = %e,
                "ffmpeg unavailable, using empty placeholder"
            );
            create_placeholder(dir, filename)
        }
    }
}

/// Create an empty placeholder file at `dir/filename`.
pub fn create_placeholder(dir: &Path, filename: &str) -> Result<PathBuf, SandboxSetupError> {
    let path = dir.join(filename);
    std::fs::write(&path, b"").map_err(|source| SandboxSetupError::Placeholder {
        filename: filename.to_string(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "created generic placeholder");
    Ok(path)
}
