//! Media probing through `ffprobe`.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

/// Geometry and length of a video file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
}

impl VideoInfo {
    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ffprobe could not read {path}: {stderr}")]
    Failed { path: PathBuf, stderr: String },

    #[error("Unusable probe output for {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Measures media files. Implemented by [`FfprobeProbe`] and by test fakes.
pub trait MediaProbe: Send + Sync {
    /// Duration of an audio file in seconds.
    fn audio_duration(&self, path: &Path) -> Result<f64, ProbeError>;

    /// Dimensions and duration of the first video stream.
    fn video_info(&self, path: &Path) -> Result<VideoInfo, ProbeError>;
}

/// [`MediaProbe`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: String,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, path: &Path, entries: &str, select: Option<&str>) -> Result<ProbeOutput, ProbeError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["-v", "error"]);
        if let Some(stream) = select {
            cmd.args(["-select_streams", stream]);
        }
        cmd.args(["-show_entries", entries, "-of", "json"]).arg(path);

        let output = cmd.output().map_err(|source| ProbeError::Spawn {
            binary: self.binary.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| ProbeError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MediaProbe for FfprobeProbe {
    fn audio_duration(&self, path: &Path) -> Result<f64, ProbeError> {
        let probe = self.run(path, "format=duration", None)?;
        probe
            .format
            .and_then(|f| f.duration)
            .and_then(|d| parse_duration(&d))
            .ok_or_else(|| ProbeError::Parse {
                path: path.to_path_buf(),
                reason: "missing or invalid duration".to_string(),
            })
    }

    fn video_info(&self, path: &Path) -> Result<VideoInfo, ProbeError> {
        let probe = self.run(
            path,
            "stream=width,height,duration:format=duration",
            Some("v:0"),
        )?;
        video_info_from(&probe, path)
    }
}

/// Video geometry and length from probe output.
///
/// The stream's own duration wins over the container's: a container also
/// spans its audio tracks and can outlast the picture. The container value
/// is only used for raw streams that carry no duration.
fn video_info_from(probe: &ProbeOutput, path: &Path) -> Result<VideoInfo, ProbeError> {
    let parse_err = |reason: &str| ProbeError::Parse {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let stream = probe
        .streams
        .first()
        .ok_or_else(|| parse_err("no video stream"))?;
    let width = stream.width.filter(|w| *w > 0).ok_or_else(|| parse_err("zero width"))?;
    let height = stream
        .height
        .filter(|h| *h > 0)
        .ok_or_else(|| parse_err("zero height"))?;

    let duration_secs = stream
        .duration
        .as_deref()
        .and_then(parse_duration)
        .or_else(|| {
            probe
                .format
                .as_ref()
                .and_then(|f| f.duration.as_deref())
                .and_then(parse_duration)
        })
        .ok_or_else(|| parse_err("missing duration"))?;

    Ok(VideoInfo {
        width,
        height,
        duration_secs,
    })
}

fn parse_duration(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Whether `binary` resolves on the current PATH.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
