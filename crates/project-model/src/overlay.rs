//! Positioned, time-bounded subtitle blocks.
//!
//! Overlay geometry is derived per request and never persisted.

use serde::{Deserialize, Serialize};

/// RGBA colour.
pub type Rgba = [u8; 4];

/// One text block (original or translation) after shaping and wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Display-ready lines, top to bottom.
    pub lines: Vec<String>,

    /// Font size in pixels.
    pub font_px: f32,

    /// Height of one line of glyphs in pixels.
    pub line_height: f32,

    /// Gap between consecutive lines in pixels.
    pub interline: f32,

    /// Outline width in pixels.
    pub stroke_px: f32,

    pub fill: Rgba,
    pub stroke: Rgba,

    /// Top edge in canvas coordinates.
    pub top: f32,

    /// Block height including padding.
    pub height: f32,
}

impl TextBlock {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }
}

/// Bilingual pair shown while one segment plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayBlock {
    /// Position of the segment in the timeline.
    pub segment_index: usize,

    pub unit_index: u32,

    pub start_secs: f64,
    pub duration_secs: f64,

    /// Original-script block, rendered above.
    pub original: TextBlock,

    /// Translation block, rendered below.
    pub translated: TextBlock,

    /// Vertical gap between the two blocks.
    pub spacing_px: f32,
}

impl OverlayBlock {
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }

    /// Visible on `[start, end)`.
    pub fn is_visible_at(&self, t: f64) -> bool {
        self.start_secs <= t && t < self.end_secs()
    }

    /// Top of the stacked pair.
    pub fn top(&self) -> f32 {
        self.original.top
    }

    /// Bottom of the stacked pair.
    pub fn bottom(&self) -> f32 {
        self.translated.bottom()
    }
}
