//! Font loading and text measurement.

use std::path::{Path, PathBuf};

use rusttype::{point, Font, Scale};
use versereel_common::{GenerationError, GenerationResult, TextConfig};

/// Platform fonts tried, in order, when the translation font is missing.
const FALLBACK_TRANSLATION_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Pixel measurement of single-line strings.
pub trait TextMeasure {
    /// Advance width of `text` at `px`.
    fn line_width(&self, text: &str, px: f32) -> f32;

    /// Ascent-to-descent height of one line at `px`.
    fn line_height(&self, px: f32) -> f32;
}

/// A parsed TrueType font and where it came from.
#[derive(Clone)]
pub struct LoadedFont {
    pub path: PathBuf,
    pub font: Font<'static>,
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFont").field("path", &self.path).finish()
    }
}

impl LoadedFont {
    pub fn load(path: &Path) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        let font = Font::try_from_vec(bytes)?;
        Some(Self {
            path: path.to_path_buf(),
            font,
        })
    }
}

impl TextMeasure for LoadedFont {
    fn line_width(&self, text: &str, px: f32) -> f32 {
        let scale = Scale::uniform(px);
        self.font
            .layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }

    fn line_height(&self, px: f32) -> f32 {
        let v = self.font.v_metrics(Scale::uniform(px));
        v.ascent - v.descent
    }
}

/// The two fonts used for subtitles.
#[derive(Debug, Clone)]
pub struct FontSet {
    pub original: LoadedFont,
    pub translation: LoadedFont,
}

impl FontSet {
    /// Load fonts from config.
    ///
    /// The original-script font is required. The translation font falls
    /// back to a platform font, then to the original-script font.
    pub fn load(text: &TextConfig) -> GenerationResult<Self> {
        let original =
            LoadedFont::load(&text.original_font).ok_or_else(|| GenerationError::FontUnavailable {
                path: text.original_font.clone(),
            })?;

        let translation = match LoadedFont::load(&text.translation_font) {
            Some(font) => font,
            None => {
                let fallback = FALLBACK_TRANSLATION_FONTS
                    .iter()
                    .find_map(|p| LoadedFont::load(Path::new(p)))
                    .unwrap_or_else(|| original.clone());
                tracing::warn!(
                    requested = %text.translation_font.display(),
                    using = %fallback.path.display(),
                    "Translation font unavailable, using fallback"
                );
                fallback
            }
        };

        tracing::debug!(
            original = %original.path.display(),
            translation = %translation.path.display(),
            "Loaded subtitle fonts"
        );
        Ok(Self {
            original,
            translation,
        })
    }
}
