//! VerseReel Processing Core
//!
//! Pure computation between the timeline and the renderer:
//! - **Shaping:** contextual Arabic joining and bidi reordering
//! - **Wrapping:** character and pixel based word wrap
//! - **Fonts:** TrueType loading and measurement
//! - **Layout:** resolution-scaled bilingual overlay blocks
//! - **Background:** rotate/scale/crop/loop/trim plan for the background track
//! - **Subtitles:** SRT/VTT sidecars
//!
//! Apart from reading font files and writing sidecars, nothing here does I/O.

pub mod background;
pub mod fonts;
pub mod layout;
pub mod shaping;
pub mod subtitles;
pub mod wrap;

pub use background::BackgroundPlan;
pub use fonts::{FontSet, LoadedFont, TextMeasure};
pub use layout::{LayoutMetrics, SubtitleLayout};
pub use shaping::{ArabicShaper, Shaper};
