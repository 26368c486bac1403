//! Subtitle sidecars in SRT and VTT formats.
//!
//! Cues carry the logical (unshaped) text: players do their own shaping.

use std::path::Path;

use versereel_common::GenerationResult;
use versereel_project_model::Segment;

fn cue_text(segment: &Segment) -> String {
    let original = segment.original_text.trim();
    let translated = segment.translated_text.trim();
    match (original.is_empty(), translated.is_empty()) {
        (false, false) => format!("{original}\n{translated}"),
        (false, true) => original.to_string(),
        _ => translated.to_string(),
    }
}

/// Generate SRT content, one cue per segment.
pub fn generate_srt(segments: &[Segment]) -> String {
    let mut output = String::new();

    for (i, segment) in segments.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(segment.start_secs),
            format_srt_time(segment.end_secs()),
        ));
        output.push_str(&cue_text(segment));
        output.push_str("\n\n");
    }

    output
}

/// Generate WebVTT content, one cue per segment.
pub fn generate_vtt(segments: &[Segment]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for segment in segments {
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_time(segment.start_secs),
            format_vtt_time(segment.end_secs()),
        ));
        output.push_str(&cue_text(segment));
        output.push_str("\n\n");
    }

    output
}

fn split_millis(secs: f64) -> (u64, u64, u64, u64) {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    (
        total_ms / 3_600_000,
        (total_ms % 3_600_000) / 60_000,
        (total_ms % 60_000) / 1000,
        total_ms % 1000,
    )
}

/// Format seconds as SRT timestamp: HH:MM:SS,mmm
fn format_srt_time(secs: f64) -> String {
    let (hours, minutes, seconds, millis) = split_millis(secs);
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Format seconds as VTT timestamp: HH:MM:SS.mmm
fn format_vtt_time(secs: f64) -> String {
    let (hours, minutes, seconds, millis) = split_millis(secs);
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Write subtitles next to an output. `.vtt` selects WebVTT, anything else SRT.
pub fn save_subtitles(segments: &[Segment], path: &Path) -> GenerationResult<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("vtt") => generate_vtt(segments),
        _ => generate_srt(segments),
    };
    std::fs::write(path, content)?;
    Ok(())
}
