//! Background track adaptation plan.
//!
//! Given a probed source video, a target canvas, and the authoritative
//! output duration, decide how to rotate, scale, crop, loop, and trim the
//! background. The plan is pure data; renderers turn it into ffmpeg
//! arguments with [`BackgroundPlan::input_args`] and
//! [`BackgroundPlan::filter_chain`].

use std::path::Path;

use versereel_common::{GenerationError, GenerationResult, VideoInfo};
use versereel_project_model::CanvasSpec;

/// Background kept beyond the narration so container timestamps and frame
/// rounding never leave the output's last frames uncovered.
pub const COVERAGE_MARGIN_SECS: f64 = 0.5;

/// How the background is normalized to the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundPlan {
    /// Source as probed.
    pub source: VideoInfo,

    /// Rotate 90° clockwise so the source orientation matches the canvas.
    pub rotate: bool,

    /// Upscaled size, when the (rotated) source is smaller than the canvas
    /// in either dimension.
    pub scaled: Option<(u32, u32)>,

    /// Center crop: x offset, y offset. Width/height are the canvas size.
    pub crop_x: u32,
    pub crop_y: u32,

    pub canvas: CanvasSpec,

    /// Extra passes over the input (`-stream_loop`).
    pub loop_count: u32,

    /// Final length, equal to the total narration duration.
    pub trim_secs: f64,

    pub fps: u32,
}

impl BackgroundPlan {
    /// Plan the adaptation of the video at `path` described by `info`.
    pub fn compute(
        path: &Path,
        info: &VideoInfo,
        canvas: CanvasSpec,
        total_secs: f64,
        fps: u32,
    ) -> GenerationResult<Self> {
        if info.width == 0 || info.height == 0 {
            return Err(GenerationError::background_load(path, "video has no frames"));
        }
        if !info.duration_secs.is_finite() || info.duration_secs <= 0.0 {
            return Err(GenerationError::background_load(
                path,
                format!("invalid duration {}", info.duration_secs),
            ));
        }
        if !total_secs.is_finite() || total_secs <= 0.0 {
            return Err(GenerationError::invalid_input(format!(
                "output duration must be positive, got {total_secs}"
            )));
        }

        let rotate = info.width != info.height && info.is_portrait() != canvas.is_portrait();
        let (w, h) = if rotate {
            (info.height, info.width)
        } else {
            (info.width, info.height)
        };

        let factor = f64::max(
            canvas.width as f64 / w as f64,
            canvas.height as f64 / h as f64,
        );
        let scaled = (factor > 1.0).then(|| {
            (
                ((w as f64 * factor).ceil() as u32).max(canvas.width),
                ((h as f64 * factor).ceil() as u32).max(canvas.height),
            )
        });
        let (sw, sh) = scaled.unwrap_or((w, h));

        Ok(Self {
            source: *info,
            rotate,
            scaled,
            crop_x: (sw - canvas.width) / 2,
            crop_y: (sh - canvas.height) / 2,
            canvas,
            loop_count: loops_needed(info.duration_secs, total_secs),
            trim_secs: total_secs,
            fps: fps.max(1),
        })
    }

    /// Seconds of background available before trimming.
    pub fn covered_secs(&self) -> f64 {
        self.source.duration_secs * (self.loop_count as f64 + 1.0)
    }

    /// Input options placed before `-i` plus the input itself.
    pub fn input_args(&self, path: &Path) -> Vec<String> {
        let mut args = Vec::new();
        if self.loop_count > 0 {
            args.push("-stream_loop".to_string());
            args.push(self.loop_count.to_string());
        }
        // Probed dimensions are the coded ones; keep frames unrotated to match.
        args.push("-noautorotate".to_string());
        args.push("-i".to_string());
        args.push(path.to_string_lossy().into_owned());
        args
    }

    /// Comma-separated ffmpeg video filter chain for the plan.
    pub fn filter_chain(&self) -> String {
        let mut filters = Vec::new();
        if self.rotate {
            filters.push("transpose=1".to_string());
        }
        if let Some((w, h)) = self.scaled {
            filters.push(format!("scale={w}:{h}:flags=lanczos"));
        }
        filters.push(format!(
            "crop={}:{}:{}:{}",
            self.canvas.width, self.canvas.height, self.crop_x, self.crop_y
        ));
        filters.push("setsar=1".to_string());
        filters.push(format!("fps={}", self.fps));
        filters.join(",")
    }
}

/// Smallest `n` such that `(n + 1) * source >= total + margin`.
fn loops_needed(source_secs: f64, total_secs: f64) -> u32 {
    let needed = total_secs + COVERAGE_MARGIN_SECS;
    if source_secs >= needed {
        return 0;
    }
    let mut n = ((needed / source_secs).ceil() as u32).saturating_sub(1);
    while source_secs * (n as f64 + 1.0) < needed {
        n += 1;
    }
    n
}
