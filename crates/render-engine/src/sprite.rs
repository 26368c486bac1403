//! Subtitle overlay rasterization.
//!
//! Each [`OverlayBlock`] becomes one transparent full-width strip holding
//! both text blocks, outlined with the stroke colour. Both backends draw
//! from the same sprites so their output matches.

use std::path::Path;

use image::{GrayImage, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;
use rusttype::{point, Scale};
use versereel_common::{GenerationError, GenerationResult};
use versereel_processing_core::{FontSet, LoadedFont, TextMeasure};
use versereel_project_model::{CanvasSpec, OverlayBlock, Rgba, TextBlock};

/// A rasterized overlay and where and when it is shown.
#[derive(Debug, Clone)]
pub struct OverlaySprite {
    pub unit_index: u32,
    pub start_secs: f64,
    pub end_secs: f64,
    /// Top-left corner on the canvas.
    pub x: u32,
    pub y: u32,
    pub image: RgbaImage,
}

impl OverlaySprite {
    /// Visible on `[start, end)`.
    pub fn is_visible_at(&self, t: f64) -> bool {
        self.start_secs <= t && t < self.end_secs
    }

    pub fn save_png(&self, path: &Path) -> GenerationResult<()> {
        self.image.save(path).map_err(|e| {
            GenerationError::encoding(format!(
                "Failed to write overlay for unit {} to {}: {e}",
                self.unit_index,
                path.display()
            ))
        })
    }
}

/// Rasterize one overlay.
pub fn rasterize(overlay: &OverlayBlock, fonts: &FontSet, canvas: CanvasSpec) -> OverlaySprite {
    let max_top = canvas.height.saturating_sub(1);
    let top = (overlay.top().max(0.0).floor() as u32).min(max_top);
    let bottom = (overlay.bottom().ceil().max(0.0) as u32)
        .min(canvas.height)
        .max(top + 1);

    let mut image = RgbaImage::new(canvas.width, bottom - top);
    draw_block(&mut image, &overlay.original, &fonts.original, top as f32);
    draw_block(&mut image, &overlay.translated, &fonts.translation, top as f32);

    OverlaySprite {
        unit_index: overlay.unit_index,
        start_secs: overlay.start_secs,
        end_secs: overlay.end_secs(),
        x: 0,
        y: top,
        image,
    }
}

/// Rasterize every overlay, keeping their order.
pub fn rasterize_all(
    overlays: &[OverlayBlock],
    fonts: &FontSet,
    canvas: CanvasSpec,
) -> Vec<OverlaySprite> {
    let sprites: Vec<_> = overlays
        .iter()
        .map(|o| rasterize(o, fonts, canvas))
        .collect();
    tracing::debug!(count = sprites.len(), "Rasterized subtitle overlays");
    sprites
}

fn draw_block(target: &mut RgbaImage, block: &TextBlock, font: &LoadedFont, origin_y: f32) {
    if block.is_empty() {
        return;
    }
    let mask = glyph_mask(target.dimensions(), block, font, origin_y);

    let radius = block.stroke_px.round().clamp(0.0, u8::MAX as f32) as u8;
    if radius > 0 {
        paint(target, &dilate(&mask, Norm::LInf, radius), block.stroke);
    }
    paint(target, &mask, block.fill);
}

/// Coverage mask of the block's lines, each centered horizontally and the
/// whole text centered vertically inside the padded block.
fn glyph_mask(
    (width, height): (u32, u32),
    block: &TextBlock,
    font: &LoadedFont,
    origin_y: f32,
) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let scale = Scale::uniform(block.font_px);
    let ascent = font.font.v_metrics(scale).ascent;

    let n = block.lines.len() as f32;
    let text_height = n * block.line_height + (n - 1.0).max(0.0) * block.interline;
    let content_top = block.top - origin_y + (block.height - text_height) / 2.0;

    for (i, line) in block.lines.iter().enumerate() {
        let line_width = font.line_width(line, block.font_px);
        let x = ((width as f32 - line_width) / 2.0).max(0.0);
        let baseline = content_top + i as f32 * (block.line_height + block.interline) + ascent;

        for glyph in font.font.layout(line, scale, point(x, baseline)) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, v| {
                let px = bb.min.x + gx as i32;
                let py = bb.min.y + gy as i32;
                if px < 0 || py < 0 || px as u32 >= width || py as u32 >= height {
                    return;
                }
                let coverage = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                let pixel = mask.get_pixel_mut(px as u32, py as u32);
                pixel.0[0] = pixel.0[0].max(coverage);
            });
        }
    }
    mask
}

/// Paint `color` through `mask` onto `target`.
fn paint(target: &mut RgbaImage, mask: &GrayImage, color: Rgba) {
    for (x, y, m) in mask.enumerate_pixels() {
        if m.0[0] > 0 {
            blend_over(target.get_pixel_mut(x, y), color, m.0[0]);
        }
    }
}

/// Source-over compositing in straight alpha.
fn blend_over(dst: &mut image::Rgba<u8>, color: Rgba, coverage: u8) {
    let sa = (coverage as f32 / 255.0) * (color[3] as f32 / 255.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let v = (color[c] as f32 * sa + dst.0[c] as f32 * da * (1.0 - sa)) / out_a;
        dst.0[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round() as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE_FONT: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../testdata/fonts/DejaVuSans.ttf"
    );

    fn fixture_fonts() -> FontSet {
        let font = LoadedFont::load(Path::new(FIXTURE_FONT)).expect("fixture font under testdata/fonts");
        FontSet {
            original: font.clone(),
            translation: font,
        }
    }

    fn block(lines: &[&str], top: f32) -> TextBlock {
        TextBlock {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            font_px: 40.0,
            line_height: 48.0,
            interline: 8.0,
            stroke_px: 2.0,
            fill: [255, 255, 255, 255],
            stroke: [0, 0, 0, 255],
            top,
            height: 150.0,
        }
    }

    #[test]
    fn test_blend_over_transparent_takes_source() {
        let mut px = image::Rgba([0, 0, 0, 0]);
        blend_over(&mut px, [200, 100, 50, 255], 255);
        assert_eq!(px.0, [200, 100, 50, 255]);
    }

    #[test]
    fn test_blend_over_half_coverage_mixes() {
        let mut px = image::Rgba([0, 0, 0, 255]);
        blend_over(&mut px, [255, 255, 255, 255], 128);
        assert!(px.0[0] > 120 && px.0[0] < 135);
        assert_eq!(px.0[3], 255);
    }

    #[test]
    fn test_stroke_surrounds_fill() {
        let mut mask = GrayImage::new(9, 9);
        mask.put_pixel(4, 4, image::Luma([255]));
        let outline = dilate(&mask, Norm::LInf, 2);

        let mut target = RgbaImage::new(9, 9);
        paint(&mut target, &outline, [0, 0, 0, 255]);
        paint(&mut target, &mask, [255, 255, 255, 255]);

        assert_eq!(target.get_pixel(4, 4).0, [255, 255, 255, 255]);
        assert_eq!(target.get_pixel(2, 2).0, [0, 0, 0, 255]);
        assert_eq!(target.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_rasterized_text_lands_inside_its_block() {
        let fonts = fixture_fonts();
        let overlay = OverlayBlock {
            segment_index: 0,
            unit_index: 3,
            start_secs: 1.0,
            duration_secs: 2.0,
            original: block(&["Hello"], 500.0),
            translated: block(&["world"], 680.0),
            spacing_px: 30.0,
        };
        let canvas = CanvasSpec {
            width: 720,
            height: 1280,
        };
        let sprite = rasterize(&overlay, &fonts, canvas);

        assert_eq!(sprite.y, 500);
        assert_eq!(sprite.image.width(), 720);
        assert_eq!(sprite.image.height(), 330);
        assert!(sprite.is_visible_at(1.0));
        assert!(!sprite.is_visible_at(3.0));

        let painted: Vec<(u32, u32)> = sprite
            .image
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[3] > 0)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!painted.is_empty());
        // Centered lines leave the side margins clear.
        assert!(painted.iter().all(|&(x, _)| x > 100 && x < 620));
        // Something is drawn in each of the two blocks.
        assert!(painted.iter().any(|&(_, y)| y < 150));
        assert!(painted.iter().any(|&(_, y)| y >= 180));
    }

    #[test]
    fn test_overlay_near_bottom_is_clamped_to_canvas() {
        let fonts = fixture_fonts();
        let overlay = OverlayBlock {
            segment_index: 0,
            unit_index: 1,
            start_secs: 0.0,
            duration_secs: 1.0,
            original: block(&["a"], 300.0),
            translated: block(&["b"], 480.0),
            spacing_px: 30.0,
        };
        let canvas = CanvasSpec {
            width: 640,
            height: 360,
        };
        let sprite = rasterize(&overlay, &fonts, canvas);
        assert_eq!(sprite.y + sprite.image.height(), 360);
    }
}
