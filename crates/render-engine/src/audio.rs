//! Narration track assembly.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use versereel_common::{GenerationError, GenerationResult};

use crate::ffmpeg::FfmpegRunner;

/// File name of the concatenated narration inside the work directory.
pub const NARRATION_FILE: &str = "narration.wav";
const CONCAT_LIST_FILE: &str = "narration_list.txt";

/// Concat-demuxer list naming each clip in order.
pub fn concat_list(clips: &[PathBuf]) -> String {
    let mut list = String::new();
    for clip in clips {
        // Single quotes close, escape, and reopen inside a quoted path.
        let escaped = clip.to_string_lossy().replace('\'', r"'\''");
        let _ = writeln!(list, "file '{escaped}'");
    }
    list
}

/// Arguments that join the clips listed in `list` into PCM audio at `out`.
pub fn concat_args(list: &Path, out: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list.to_string_lossy().into_owned(),
        "-vn".into(),
        "-c:a".into(),
        "pcm_s16le".into(),
        "-ar".into(),
        "44100".into(),
        "-ac".into(),
        "2".into(),
        out.to_string_lossy().into_owned(),
    ]
}

/// Joins per-unit narration clips into one track.
pub trait NarrationJoiner: Send + Sync {
    fn join(&self, clips: &[PathBuf], work_dir: &Path) -> GenerationResult<PathBuf>;
}

impl NarrationJoiner for FfmpegRunner {
    fn join(&self, clips: &[PathBuf], work_dir: &Path) -> GenerationResult<PathBuf> {
        concat_narration(self, clips, work_dir)
    }
}

/// Concatenate narration clips, in order, into one track in `work_dir`.
///
/// The output length is the sum of the clip lengths, which is the
/// authoritative video duration.
pub fn concat_narration(
    runner: &FfmpegRunner,
    clips: &[PathBuf],
    work_dir: &Path,
) -> GenerationResult<PathBuf> {
    if clips.is_empty() {
        return Err(GenerationError::invalid_input("no narration clips to join"));
    }

    let list_path = work_dir.join(CONCAT_LIST_FILE);
    std::fs::write(&list_path, concat_list(clips))?;
    let out = work_dir.join(NARRATION_FILE);

    runner.run_quiet(&concat_args(&list_path, &out))?;
    tracing::info!(clips = clips.len(), path = %out.display(), "Narration track assembled");
    Ok(out)
}
