//! Narration segments and the timeline they form.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One scripture unit inside the requested range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// 1-based unit index within its collection.
    pub unit_index: u32,

    /// Original-script text, logical order, unshaped.
    pub original_text: String,

    /// Translated text.
    pub translated_text: String,

    /// Where the narration audio was fetched from.
    pub audio_url: String,

    /// Downloaded audio file.
    pub audio_path: PathBuf,

    /// Measured audio length in seconds. Always > 0 once resolved.
    pub duration_secs: f64,

    /// Offset of this segment inside the final output, in seconds.
    pub start_secs: f64,
}

impl Segment {
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }
}

/// Ordered segments plus the authoritative output length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub segments: Vec<Segment>,
    pub total_secs: f64,
}

impl Timeline {
    /// Build a timeline, recomputing each segment's start offset as the sum
    /// of the durations before it.
    pub fn from_segments(mut segments: Vec<Segment>) -> Self {
        segments.sort_by_key(|s| s.unit_index);
        let mut cursor = 0.0;
        for segment in &mut segments {
            segment.start_secs = cursor;
            cursor += segment.duration_secs;
        }
        Self {
            segments,
            total_secs: cursor,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Segment playing at time `t`, if any.
    pub fn segment_at(&self, t: f64) -> Option<&Segment> {
        let idx = self.segments.partition_point(|s| s.end_secs() <= t);
        self.segments
            .get(idx)
            .filter(|s| s.start_secs <= t && t < s.end_secs())
    }
}
