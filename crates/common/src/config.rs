//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "VERSEREEL_CONFIG";

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Filesystem layout.
    pub paths: PathsConfig,

    /// Scripture data provider.
    pub provider: ProviderConfig,

    /// Encoding profile used for every output.
    pub encoding: EncodingProfile,

    /// Subtitle text styling and layout.
    pub text: TextConfig,

    /// Renderer backend selection.
    pub render: RenderConfig,

    /// Progress channel tuning.
    pub progress: ProgressConfig,

    /// Output naming and sidecars.
    pub output: OutputConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Where things live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root under which per-request temporary directories are created.
    pub temp_root: PathBuf,

    /// Durable directory for finished outputs.
    pub output_dir: PathBuf,

    /// Local background used when the requested one cannot be downloaded.
    pub fallback_background: PathBuf,

    /// Directory for daily log files.
    pub logs_dir: PathBuf,
}

/// Scripture provider endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the text/audio API.
    pub base_url: String,

    /// Base URL used to build audio locators the provider did not supply.
    pub audio_fallback_base: String,

    /// HTTP timeout for provider queries, in seconds.
    pub timeout_secs: u64,

    /// HTTP timeout for asset downloads, in seconds.
    pub download_timeout_secs: u64,

    /// Highest valid collection id (collections are 1-based).
    pub collection_count: u32,
}

/// Fixed encoding preset family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecPreset {
    H264,
    H265,
}

/// Encoder settings shared by both renderer backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingProfile {
    pub fps: u32,
    pub codec: CodecPreset,
    pub video_bitrate: String,
    pub audio_bitrate: String,
    /// x264/x265 speed preset.
    pub speed_preset: String,
    /// Encoder thread count (0 lets ffmpeg decide).
    pub threads: u32,
}

/// Vertical anchoring of the subtitle stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAnchor {
    /// Stack centered at 70% of canvas height.
    LowerThird,
    /// Stack centered at exactly half the canvas height.
    Center,
}

impl VerticalAnchor {
    /// Fraction of canvas height where the stack center sits.
    pub fn fraction(self) -> f32 {
        match self {
            Self::LowerThird => 0.70,
            Self::Center => 0.50,
        }
    }
}

/// Subtitle styling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Font for the original (right-to-left) script. Required.
    pub original_font: PathBuf,

    /// Font for the translation. Falls back to a platform font when missing.
    pub translation_font: PathBuf,

    /// Original-script font size at the reference width.
    pub font_size: f32,

    /// Canvas width the pixel constants were designed for.
    pub reference_width: u32,

    pub original_color: String,
    pub translation_color: String,
    pub stroke_color: String,

    pub anchor: VerticalAnchor,
}

/// Which renderer backend composes the final video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    /// In-process frame compositor (higher memory, declarative timing).
    Compositor,
    /// Single external ffmpeg filter graph over pre-rendered stills.
    FilterGraph,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub backend: RendererKind,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
}

/// Progress registry tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Events buffered per channel before the oldest are dropped.
    pub buffer_capacity: usize,

    /// How long a subscriber waits for an unknown id to be registered.
    pub subscribe_wait_ms: u64,

    /// How long a finished, never-subscribed channel is retained.
    pub retention_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output file name prefix.
    pub file_prefix: String,

    /// Write an `.srt` next to every output.
    pub subtitle_sidecar: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "versereel=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional directory for a daily log file.
    pub dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data = data_dir();
        Self {
            temp_root: std::env::temp_dir().join("versereel"),
            output_dir: data.join("output"),
            fallback_background: PathBuf::from("videos").join("default_background.mp4"),
            logs_dir: data.join("logs"),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api.alquran.cloud/v1".to_string(),
            audio_fallback_base: "https://everyayah.com/data".to_string(),
            timeout_secs: 10,
            download_timeout_secs: 30,
            collection_count: 114,
        }
    }
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self {
            fps: 24,
            codec: CodecPreset::H264,
            video_bitrate: "8000k".to_string(),
            audio_bitrate: "128k".to_string(),
            speed_preset: "ultrafast".to_string(),
            threads: 1,
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        let fonts = PathBuf::from("fonts");
        Self {
            original_font: fonts.join("Amiri-Regular.ttf"),
            translation_font: fonts.join("arial.ttf"),
            font_size: 70.0,
            reference_width: 1080,
            original_color: "#FFFFFF".to_string(),
            translation_color: "#CCCCCC".to_string(),
            stroke_color: "#000000".to_string(),
            anchor: VerticalAnchor::LowerThird,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: RendererKind::FilterGraph,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 64,
            subscribe_wait_ms: 5_000,
            retention_secs: 60,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_prefix: "recitation".to_string(),
            subtitle_sidecar: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            dir: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Config file location: `$VERSEREEL_CONFIG`, else the XDG config dir.
pub fn config_file_path() -> PathBuf {
    if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(explicit);
    }
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("versereel").join("config.json")
}

fn data_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("versereel")
}
