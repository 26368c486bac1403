//! Bilingual subtitle layout.
//!
//! Pixel constants are designed for a 1080 px wide canvas and scale
//! linearly with the actual canvas width. For each segment the
//! original-script block sits above the translation block and the pair is
//! centered as a unit on the configured anchor line.

use versereel_common::TextConfig;
use versereel_project_model::{CanvasSpec, OverlayBlock, Rgba, Segment, TextBlock, Timeline};

use crate::fonts::TextMeasure;
use crate::shaping::{shape_lines, Shaper};
use crate::wrap::wrap_pixels;

const TRANSLATION_RATIO: f32 = 0.75;
const SPACING_RATIO: f32 = 0.5;
const SIDE_MARGIN_RATIO: f32 = 0.08;
const BLOCK_PADDING: f32 = 60.0;
const INNER_MARGIN: f32 = 15.0;
const ORIGINAL_INTERLINE: f32 = 12.0;
const TRANSLATION_INTERLINE: f32 = 8.0;
const ORIGINAL_STROKE: f32 = 2.0;
const TRANSLATION_STROKE: f32 = 1.5;
/// Average glyph advance as a fraction of the font size, used to estimate
/// how many original-script characters fit on a line.
const GLYPH_WIDTH_RATIO: f32 = 0.5;
const MIN_WRAP_CHARS: usize = 40;

const WHITE: Rgba = [255, 255, 255, 255];
const LIGHT_GREY: Rgba = [204, 204, 204, 255];
const BLACK: Rgba = [0, 0, 0, 255];

/// Resolution-scaled layout metrics for one canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutMetrics {
    pub scale: f32,
    pub original_px: f32,
    pub translation_px: f32,
    pub spacing: f32,
    pub margin_x: f32,
    pub max_text_width: f32,
    pub padding: f32,
    pub inner_margin: f32,
    pub original_interline: f32,
    pub translation_interline: f32,
    pub original_stroke: f32,
    pub translation_stroke: f32,
    /// Vertical center of the stacked pair.
    pub center_y: f32,
    /// Original-script wrap width in visible characters.
    pub wrap_chars: usize,
}

impl LayoutMetrics {
    pub fn new(text: &TextConfig, canvas: &CanvasSpec) -> Self {
        let scale = canvas.scale_from(text.reference_width);
        let original_px = text.font_size * scale;
        let margin_x = canvas.width as f32 * SIDE_MARGIN_RATIO;
        let max_text_width = canvas.width as f32 - 2.0 * margin_x;

        let estimated = (max_text_width / (original_px * GLYPH_WIDTH_RATIO)).floor();
        let wrap_chars = if estimated.is_finite() && estimated > 0.0 {
            (estimated as usize).max(MIN_WRAP_CHARS)
        } else {
            MIN_WRAP_CHARS
        };

        Self {
            scale,
            original_px,
            translation_px: original_px * TRANSLATION_RATIO,
            spacing: original_px * SPACING_RATIO,
            margin_x,
            max_text_width,
            padding: BLOCK_PADDING * scale,
            inner_margin: INNER_MARGIN * scale,
            original_interline: ORIGINAL_INTERLINE * scale,
            translation_interline: TRANSLATION_INTERLINE * scale,
            original_stroke: ORIGINAL_STROKE * scale,
            translation_stroke: TRANSLATION_STROKE * scale,
            center_y: canvas.height as f32 * text.anchor.fraction(),
            wrap_chars,
        }
    }
}

/// Parse `#RRGGBB` or `#RRGGBBAA`.
pub fn parse_hex_color(raw: &str) -> Option<Rgba> {
    let hex = raw.trim().strip_prefix('#').unwrap_or(raw.trim());
    if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let alpha = if hex.len() == 8 { byte(6)? } else { 255 };
    Some([byte(0)?, byte(2)?, byte(4)?, alpha])
}

fn color_or(raw: &str, default: Rgba, field: &str) -> Rgba {
    parse_hex_color(raw).unwrap_or_else(|| {
        tracing::warn!(field, value = raw, "Invalid colour, using default");
        default
    })
}

/// Computes [`OverlayBlock`]s for a timeline on one canvas.
#[derive(Debug, Clone)]
pub struct SubtitleLayout {
    metrics: LayoutMetrics,
    canvas: CanvasSpec,
    original_fill: Rgba,
    translation_fill: Rgba,
    stroke: Rgba,
}

struct BlockParams {
    px: f32,
    interline: f32,
    stroke_px: f32,
    fill: Rgba,
}

impl SubtitleLayout {
    pub fn new(text: &TextConfig, canvas: CanvasSpec) -> Self {
        Self {
            metrics: LayoutMetrics::new(text, &canvas),
            canvas,
            original_fill: color_or(&text.original_color, WHITE, "original_color"),
            translation_fill: color_or(&text.translation_color, LIGHT_GREY, "translation_color"),
            stroke: color_or(&text.stroke_color, BLACK, "stroke_color"),
        }
    }

    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    /// Lay out every segment of `timeline`, in order.
    pub fn layout(
        &self,
        timeline: &Timeline,
        shaper: &dyn Shaper,
        original_font: &dyn TextMeasure,
        translation_font: &dyn TextMeasure,
    ) -> Vec<OverlayBlock> {
        timeline
            .segments
            .iter()
            .enumerate()
            .map(|(i, seg)| self.layout_segment(i, seg, shaper, original_font, translation_font))
            .collect()
    }

    pub fn layout_segment(
        &self,
        index: usize,
        segment: &Segment,
        shaper: &dyn Shaper,
        original_font: &dyn TextMeasure,
        translation_font: &dyn TextMeasure,
    ) -> OverlayBlock {
        let m = &self.metrics;

        let original_lines = shape_lines(shaper, &segment.original_text, m.wrap_chars);
        let mut original = self.block(
            original_lines,
            original_font,
            BlockParams {
                px: m.original_px,
                interline: m.original_interline,
                stroke_px: m.original_stroke,
                fill: self.original_fill,
            },
        );

        let translated_lines = wrap_pixels(&segment.translated_text, m.max_text_width, |line| {
            translation_font.line_width(line, m.translation_px)
        });
        let mut translated = self.block(
            translated_lines,
            translation_font,
            BlockParams {
                px: m.translation_px,
                interline: m.translation_interline,
                stroke_px: m.translation_stroke,
                fill: self.translation_fill,
            },
        );

        let total = original.height + translated.height + m.spacing;
        let max_top = (self.canvas.height as f32 - total).max(0.0);
        let top = (m.center_y - total / 2.0).clamp(0.0, max_top);
        original.top = top;
        translated.top = top + original.height + m.spacing;

        OverlayBlock {
            segment_index: index,
            unit_index: segment.unit_index,
            start_secs: segment.start_secs,
            duration_secs: segment.duration_secs,
            original,
            translated,
            spacing_px: m.spacing,
        }
    }

    /// Build a block for already wrapped lines, shrinking the font if the
    /// widest line overflows the text-safe width.
    fn block(&self, lines: Vec<String>, font: &dyn TextMeasure, params: BlockParams) -> TextBlock {
        let m = &self.metrics;
        let widest = lines
            .iter()
            .map(|l| font.line_width(l, params.px))
            .fold(0.0_f32, f32::max);
        let px = if widest > m.max_text_width && widest > 0.0 {
            params.px * m.max_text_width / widest
        } else {
            params.px
        };

        let line_height = font.line_height(px);
        let n = lines.len() as f32;
        let text_height = n * line_height + (n - 1.0).max(0.0) * params.interline;

        TextBlock {
            lines,
            font_px: px,
            line_height,
            interline: params.interline,
            stroke_px: params.stroke_px,
            fill: params.fill,
            stroke: self.stroke,
            top: 0.0,
            height: text_height + 2.0 * m.inner_margin + m.padding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use versereel_common::VerticalAnchor;
    use versereel_project_model::{Platform, ResolutionTier};

    use crate::shaping::{ArabicShaper, ShapingError};

    /// Every glyph is half the font size wide.
    struct Mono;

    impl TextMeasure for Mono {
        fn line_width(&self, text: &str, px: f32) -> f32 {
            crate::wrap::visible_len(text) as f32 * px * 0.5
        }

        fn line_height(&self, px: f32) -> f32 {
            px * 1.2
        }
    }

    #[derive(Default)]
    struct RecordingShaper {
        seen: Mutex<Vec<String>>,
    }

    impl Shaper for RecordingShaper {
        fn shape_line(&self, line: &str) -> Result<String, ShapingError> {
            self.seen.lock().unwrap().push(line.to_string());
            Ok(line.to_string())
        }
    }

    fn segment(unit: u32, original: &str, translated: &str, duration: f64) -> Segment {
        Segment {
            unit_index: unit,
            original_text: original.to_string(),
            translated_text: translated.to_string(),
            audio_url: String::new(),
            audio_path: PathBuf::new(),
            duration_secs: duration,
            start_secs: 0.0,
        }
    }

    fn portrait_1080() -> CanvasSpec {
        CanvasSpec::for_request(Platform::Portrait, ResolutionTier::P1080)
    }

    #[test]
    fn test_metrics_at_reference_width() {
        let m = LayoutMetrics::new(&TextConfig::default(), &portrait_1080());
        assert!((m.scale - 1.0).abs() < 1e-6);
        assert!((m.original_px - 70.0).abs() < 1e-4);
        assert!((m.translation_px - 52.5).abs() < 1e-4);
        assert!((m.spacing - 35.0).abs() < 1e-4);
        assert!((m.margin_x - 86.4).abs() < 1e-3);
        assert_eq!(m.wrap_chars, 40);
        assert!((m.center_y - 1344.0).abs() < 1e-3);
    }

    #[test]
    fn test_metrics_scale_with_width() {
        let canvas = CanvasSpec::for_request(Platform::Portrait, ResolutionTier::P360);
        let m = LayoutMetrics::new(&TextConfig::default(), &canvas);
        assert!((m.original_px - 70.0 / 3.0).abs() < 1e-3);
        assert!((m.padding - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_center_anchor() {
        let config = TextConfig {
            anchor: VerticalAnchor::Center,
            ..TextConfig::default()
        };
        let m = LayoutMetrics::new(&config, &portrait_1080());
        assert!((m.center_y - 960.0).abs() < 1e-3);
    }

    #[test]
    fn test_overlay_timing_follows_segments() {
        let timeline = Timeline::from_segments(vec![
            segment(1, "\u{0628}\u{0633}\u{0645}", "In the name", 2.5),
            segment(2, "\u{0627}\u{0644}\u{0644}\u{0647}", "of God", 4.0),
        ]);
        let layout = SubtitleLayout::new(&TextConfig::default(), portrait_1080());
        let overlays = layout.layout(&timeline, &ArabicShaper, &Mono, &Mono);

        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays[0].start_secs, 0.0);
        assert_eq!(overlays[1].start_secs, 2.5);
        assert_eq!(overlays[1].duration_secs, 4.0);
        assert_eq!(overlays[1].unit_index, 2);
    }

    #[test]
    fn test_stack_is_centered_on_anchor() {
        let layout = SubtitleLayout::new(&TextConfig::default(), portrait_1080());
        let seg = segment(1, "\u{0628}\u{0633}\u{0645}", "In the name of God", 3.0);
        let overlay = layout.layout_segment(0, &seg, &ArabicShaper, &Mono, &Mono);

        let mid = (overlay.top() + overlay.bottom()) / 2.0;
        assert!((mid - 1344.0).abs() < 0.5, "stack center {mid}");
        assert!(
            (overlay.translated.top - overlay.original.bottom() - overlay.spacing_px).abs() < 1e-3
        );
    }

    #[test]
    fn test_translation_is_never_shaped() {
        let shaper = RecordingShaper::default();
        let layout = SubtitleLayout::new(&TextConfig::default(), portrait_1080());
        let arabic_translation = "\u{0628}\u{0633}\u{0645} translated";
        let seg = segment(1, "\u{0627}\u{0644}\u{0644}\u{0647}", arabic_translation, 1.0);
        let overlay = layout.layout_segment(0, &seg, &shaper, &Mono, &Mono);

        let seen = shaper.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), ["\u{0627}\u{0644}\u{0644}\u{0647}"]);
        assert_eq!(overlay.translated.lines.join(" "), arabic_translation);
    }

    #[test]
    fn test_long_translation_wraps_within_safe_width() {
        let layout = SubtitleLayout::new(&TextConfig::default(), portrait_1080());
        let text = "word ".repeat(80);
        let seg = segment(1, "\u{0628}", text.trim(), 1.0);
        let overlay = layout.layout_segment(0, &seg, &ArabicShaper, &Mono, &Mono);

        assert!(overlay.translated.lines.len() > 1);
        let max = layout.metrics().max_text_width;
        for line in &overlay.translated.lines {
            assert!(Mono.line_width(line, overlay.translated.font_px) <= max + 1e-3);
        }
    }

    #[test]
    fn test_overwide_original_line_shrinks_font() {
        let layout = SubtitleLayout::new(&TextConfig::default(), portrait_1080());
        // One unbreakable 60-letter word is wider than the safe width at 70px.
        let word = "\u{0628}".repeat(60);
        let seg = segment(1, &word, "x", 1.0);
        let overlay = layout.layout_segment(0, &seg, &ArabicShaper, &Mono, &Mono);
        assert!(overlay.original.font_px < 70.0);
        let width = Mono.line_width(&overlay.original.lines[0], overlay.original.font_px);
        assert!(width <= layout.metrics().max_text_width + 1e-2);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FFFFFF"), Some([255, 255, 255, 255]));
        assert_eq!(parse_hex_color("#CCCCCC"), Some([204, 204, 204, 255]));
        assert_eq!(parse_hex_color("00000080"), Some([0, 0, 0, 128]));
        assert_eq!(parse_hex_color("#XYZ"), None);
        assert_eq!(parse_hex_color("white"), None);
    }
}
