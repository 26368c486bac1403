//! Single ffmpeg invocation over pre-rendered overlay stills.
//!
//! Input 0 is the looped background, input 1 the narration, and inputs
//! 2.. one looped PNG per overlay. Each still is enabled only on its
//! segment's `[start, end)` window.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use versereel_common::GenerationResult;

use crate::backend::RendererBackend;
use crate::ffmpeg::{codec_args, FfmpegRunner};
use crate::job::{ProgressCallback, RenderJob, RenderProgress};
use crate::sprite::OverlaySprite;

const FIRST_STILL_INPUT: usize = 2;

/// Renders through one ffmpeg filter graph.
#[derive(Debug, Clone)]
pub struct FilterGraphBackend {
    runner: FfmpegRunner,
}

impl FilterGraphBackend {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }

    fn write_stills(&self, job: &RenderJob) -> GenerationResult<Vec<PathBuf>> {
        job.sprites
            .iter()
            .enumerate()
            .map(|(i, sprite)| {
                let path = job.work_dir.join(format!("overlay_{i:04}.png"));
                sprite.save_png(&path)?;
                Ok(path)
            })
            .collect()
    }
}

impl RendererBackend for FilterGraphBackend {
    fn render(&self, job: &RenderJob, progress: Option<ProgressCallback<'_>>) -> GenerationResult<()> {
        let total_frames = job.total_frames();
        if let Some(cb) = &progress {
            cb(RenderProgress::preparing(total_frames));
        }

        let stills = self.write_stills(job)?;
        let args = build_args(job, &stills);
        tracing::info!(
            overlays = stills.len(),
            total_secs = job.total_secs,
            output = %job.output_path.display(),
            "Rendering with filter graph"
        );
        let frames = self
            .runner
            .run(&args, job.total_secs, total_frames, progress.as_ref())?;
        job.check_frames_written(frames)
    }

    fn is_available(&self) -> bool {
        self.runner.is_available()
    }

    fn name(&self) -> &str {
        "filter_graph"
    }
}

/// The `-filter_complex` graph: adapt the background, then chain one
/// time-gated overlay per still. The result is labelled `[vout]`.
pub fn filter_complex(job: &RenderJob) -> String {
    let mut graph = format!("[0:v]{}", job.background.filter_chain());
    if job.sprites.is_empty() {
        graph.push_str("[vout]");
        return graph;
    }

    graph.push_str("[bg]");
    let mut previous = "bg".to_string();
    for (i, sprite) in job.sprites.iter().enumerate() {
        let label = if i + 1 == job.sprites.len() {
            "vout".to_string()
        } else {
            format!("v{i}")
        };
        let _ = write!(
            graph,
            ";[{previous}][{input}:v]{overlay}[{label}]",
            input = FIRST_STILL_INPUT + i,
            overlay = overlay_filter(sprite),
        );
        previous = label;
    }
    graph
}

fn overlay_filter(sprite: &OverlaySprite) -> String {
    format!(
        "overlay=x={}:y={}:enable='gte(t,{:.3})*lt(t,{:.3})'",
        sprite.x, sprite.y, sprite.start_secs, sprite.end_secs
    )
}

/// Full ffmpeg argument list for `job` given the written still paths.
pub fn build_args(job: &RenderJob, stills: &[PathBuf]) -> Vec<String> {
    let total = format!("{:.3}", job.total_secs);
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-nostats".into(),
        "-progress".into(),
        "pipe:1".into(),
    ];
    args.extend(job.background.input_args(&job.background_path));
    args.extend(["-i".into(), path_arg(&job.audio_path)]);
    for still in stills {
        args.extend([
            "-loop".into(),
            "1".into(),
            "-t".into(),
            total.clone(),
            "-i".into(),
            path_arg(still),
        ]);
    }
    args.extend([
        "-filter_complex".into(),
        filter_complex(job),
        "-map".into(),
        "[vout]".into(),
        "-map".into(),
        "1:a".into(),
    ]);
    args.extend(codec_args(&job.profile));
    args.extend([
        "-r".into(),
        job.profile.fps.to_string(),
        "-t".into(),
        total,
        path_arg(&job.output_path),
    ]);
    args
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::job_with_sprites;

    #[test]
    fn test_graph_without_overlays_is_background_only() {
        let job = job_with_sprites(&[]);
        let graph = filter_complex(&job);
        assert!(graph.starts_with("[0:v]"));
        assert!(graph.ends_with("[vout]"));
        assert!(!graph.contains("overlay="));
    }

    #[test]
    fn test_overlays_are_chained_and_time_gated() {
        let job = job_with_sprites(&[(0.0, 2.0), (2.0, 5.5)]);
        let graph = filter_complex(&job);
        assert!(graph.contains(
            "[bg][2:v]overlay=x=0:y=600:enable='gte(t,0.000)*lt(t,2.000)'[v0]"
        ));
        assert!(graph.contains(
            "[v0][3:v]overlay=x=0:y=600:enable='gte(t,2.000)*lt(t,5.500)'[vout]"
        ));
    }

    #[test]
    fn test_args_map_graph_and_narration_and_cap_duration() {
        let job = job_with_sprites(&[(0.0, 2.0), (2.0, 5.5)]);
        let stills = vec![PathBuf::from("/w/overlay_0000.png"), PathBuf::from("/w/overlay_0001.png")];
        let args = build_args(&job, &stills);
        let joined = args.join(" ");

        assert!(joined.starts_with("-y -hide_banner -nostats -progress pipe:1"));
        assert!(joined.contains("-i /w/bg.mp4 -i /w/narration.wav"));
        assert!(joined.contains("-loop 1 -t 5.500 -i /w/overlay_0000.png"));
        assert!(joined.contains("-map [vout] -map 1:a"));
        assert!(joined.contains("-r 24 -t 5.500"));
        assert_eq!(args.last().map(String::as_str), Some("/out/recitation.mp4"));
    }
}
