//! Render job description and progress reporting types.

use std::path::PathBuf;

use versereel_common::{EncodingProfile, GenerationError, GenerationResult};
use versereel_processing_core::BackgroundPlan;
use versereel_project_model::CanvasSpec;

use crate::sprite::OverlaySprite;

/// Everything a backend needs to compose one video.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Local background video.
    pub background_path: PathBuf,

    /// How the background is rotated, scaled, cropped, looped, and trimmed.
    pub background: BackgroundPlan,

    /// Rasterized subtitle overlays, ordered by start time.
    pub sprites: Vec<OverlaySprite>,

    /// Concatenated narration track.
    pub audio_path: PathBuf,

    pub canvas: CanvasSpec,

    pub profile: EncodingProfile,

    /// Final output file.
    pub output_path: PathBuf,

    /// Scratch directory for intermediate files. Owned by the caller.
    pub work_dir: PathBuf,

    /// Authoritative output duration (the narration length).
    pub total_secs: f64,
}

/// Frames an encoder may come up short by from rounding the trim point.
const FRAME_SLACK: u64 = 1;

impl RenderJob {
    /// Frames the encoder is expected to produce.
    pub fn total_frames(&self) -> u64 {
        (self.total_secs * self.profile.fps as f64).ceil().max(0.0) as u64
    }

    /// Reject a background plan that cannot cover the whole narration.
    pub fn check_background_coverage(&self) -> GenerationResult<()> {
        let covered = self.background.covered_secs();
        if covered < self.total_secs {
            return Err(GenerationError::background_load(
                &self.background_path,
                format!(
                    "background covers {covered:.3}s but the narration runs {:.3}s",
                    self.total_secs
                ),
            ));
        }
        Ok(())
    }

    /// Fail when fewer video frames were encoded than the narration needs.
    pub fn check_frames_written(&self, written: u64) -> GenerationResult<()> {
        let expected = self.total_frames();
        if written + FRAME_SLACK < expected {
            return Err(GenerationError::encoding(format!(
                "background ended early: encoded {written} of {expected} frames"
            )));
        }
        Ok(())
    }
}

/// Progress callback for rendering.
pub type ProgressCallback<'a> = Box<dyn Fn(RenderProgress) + 'a>;

/// Render progress report.
#[derive(Debug, Clone, Copy)]
pub struct RenderProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    pub frames_rendered: u64,

    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    pub stage: RenderStage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
}

impl RenderProgress {
    pub fn preparing(total_frames: u64) -> Self {
        Self {
            progress: 0.0,
            frames_rendered: 0,
            total_frames,
            eta_secs: 0.0,
            stage: RenderStage::Preparing,
        }
    }

    pub fn complete(total_frames: u64) -> Self {
        Self {
            progress: 1.0,
            frames_rendered: total_frames,
            total_frames,
            eta_secs: 0.0,
            stage: RenderStage::Complete,
        }
    }

    /// Report for `done` of `total` frames after `elapsed_secs` of work.
    pub fn rendering(done: u64, total: u64, elapsed_secs: f64) -> Self {
        let progress = if total == 0 {
            0.0
        } else {
            (done as f64 / total as f64).clamp(0.0, 1.0)
        };
        Self {
            progress,
            frames_rendered: done.min(total),
            total_frames: total,
            eta_secs: eta(progress, elapsed_secs),
            stage: RenderStage::Rendering,
        }
    }
}

pub(crate) fn eta(progress: f64, elapsed_secs: f64) -> f64 {
    if progress > 0.0 {
        ((elapsed_secs / progress) - elapsed_secs).max(0.0)
    } else {
        0.0
    }
}
