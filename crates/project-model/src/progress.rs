//! Progress events emitted by the generation pipeline.

use serde::{Deserialize, Serialize};

/// Named pipeline checkpoints and the percentage each one reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    FetchComplete,
    DownloadComplete,
    AudioReady,
    VideoReady,
    SubtitleReady,
    RenderStart,
    Encoding,
    Complete,
    Error,
}

impl Stage {
    /// Milestone percentage. `Encoding` reports its lower bound.
    pub fn percent(self) -> u8 {
        match self {
            Self::Start => 0,
            Self::FetchComplete => 10,
            Self::DownloadComplete => 25,
            Self::AudioReady => 35,
            Self::VideoReady => 50,
            Self::SubtitleReady => 60,
            Self::RenderStart | Self::Encoding => 70,
            Self::Complete => 100,
            Self::Error => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Start => "Starting",
            Self::FetchComplete => "Fetched scripture data",
            Self::DownloadComplete => "Downloaded narration audio",
            Self::AudioReady => "Audio ready",
            Self::VideoReady => "Background video ready",
            Self::SubtitleReady => "Subtitles ready",
            Self::RenderStart => "Rendering",
            Self::Encoding => "Encoding",
            Self::Complete => "Complete",
            Self::Error => "Error",
        }
    }

    /// Map an encoder fraction (0.0..=1.0) into the encoding band 70..=99.
    pub fn encoding_percent(fraction: f64) -> u8 {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        (70.0 + fraction * 29.0).floor() as u8
    }
}

/// Whether an event is intermediate or closes the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Progress,
    Complete,
    Error,
}

/// One update on a request's progress stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 0..=100, never decreasing within one request.
    pub percentage: u8,

    /// Human-readable stage label.
    pub stage: String,

    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Output path on completion, cause on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressEvent {
    pub fn progress(percentage: u8, stage: impl Into<String>) -> Self {
        Self {
            percentage: percentage.min(100),
            stage: stage.into(),
            kind: EventKind::Progress,
            message: None,
        }
    }

    pub fn at(stage: Stage) -> Self {
        Self::progress(stage.percent(), stage.label())
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            percentage: 100,
            stage: Stage::Complete.label().to_string(),
            kind: EventKind::Complete,
            message: Some(message.into()),
        }
    }

    /// Terminal error. `percentage` is the last value the stream reported.
    pub fn error(percentage: u8, message: impl Into<String>) -> Self {
        Self {
            percentage: percentage.min(100),
            stage: Stage::Error.label().to_string(),
            kind: EventKind::Error,
            message: Some(message.into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind != EventKind::Progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milestones_are_non_decreasing() {
        let order = [
            Stage::Start,
            Stage::FetchComplete,
            Stage::DownloadComplete,
            Stage::AudioReady,
            Stage::VideoReady,
            Stage::SubtitleReady,
            Stage::RenderStart,
            Stage::Encoding,
            Stage::Complete,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].percent() <= pair[1].percent(), "{:?}", pair);
        }
    }

    #[test]
    fn test_encoding_band() {
        assert_eq!(Stage::encoding_percent(0.0), 70);
        assert_eq!(Stage::encoding_percent(0.5), 84);
        assert_eq!(Stage::encoding_percent(1.0), 99);
        assert_eq!(Stage::encoding_percent(7.0), 99);
        assert_eq!(Stage::encoding_percent(f64::NAN), 70);
    }

    #[test]
    fn test_terminal_events() {
        assert!(!ProgressEvent::at(Stage::AudioReady).is_terminal());
        assert!(ProgressEvent::complete("/out.mp4").is_terminal());
        assert!(ProgressEvent::error(35, "boom").is_terminal());
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(ProgressEvent::complete("out.mp4")).unwrap();
        assert_eq!(json["type"], "complete");
        assert_eq!(json["percentage"], 100);
        assert_eq!(json["message"], "out.mp4");

        let json = serde_json::to_value(ProgressEvent::at(Stage::Start)).unwrap();
        assert!(json.get("message").is_none());
    }
}
