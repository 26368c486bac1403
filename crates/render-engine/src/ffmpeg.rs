//! ffmpeg process plumbing: spawning, progress parsing, codec arguments.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Instant;

use versereel_common::media::command_exists;
use versereel_common::{CodecPreset, EncodingProfile, GenerationError, GenerationResult};

use crate::job::{eta, ProgressCallback, RenderProgress, RenderStage};

/// Longest stderr excerpt carried in an error message.
const STDERR_TAIL_CHARS: usize = 2_000;

/// Seconds without `out_time` advancing before a stall warning.
const STALL_WARN_SECS: u64 = 10;

/// Runs the configured ffmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    binary: String,
}

impl FfmpegRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    pub(crate) fn command(&self) -> Command {
        Command::new(&self.binary)
    }

    pub(crate) fn spawn(&self, cmd: &mut Command) -> GenerationResult<ChildGuard> {
        cmd.spawn()
            .map(ChildGuard::new)
            .map_err(|e| GenerationError::encoding(format!("Failed to start {}: {e}", self.binary)))
    }

    /// Run to completion without progress reporting.
    pub fn run_quiet(&self, args: &[String]) -> GenerationResult<()> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let output = self
            .command()
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| GenerationError::encoding(format!("Failed to start {}: {e}", self.binary)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failure("ffmpeg", output.status, &stderr));
        }
        Ok(())
    }

    /// Run with `-progress pipe:1` already in `args`, reporting the encoded
    /// position against `expected_duration_secs`.
    ///
    /// Returns the last frame count ffmpeg reported.
    pub fn run(
        &self,
        args: &[String],
        expected_duration_secs: f64,
        total_frames: u64,
        progress: Option<&ProgressCallback<'_>>,
    ) -> GenerationResult<u64> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut cmd = self.command();
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = Instant::now();
        let mut child = self.spawn(&mut cmd)?;
        tracing::info!(
            pid = child.id(),
            args_len = args.len(),
            total_frames,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout()
            .ok_or_else(|| GenerationError::encoding("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr()
            .ok_or_else(|| GenerationError::encoding("Failed to capture ffmpeg stderr"))?;
        let stderr_task = drain(stderr);

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut latest = ProgressState::default();
        let mut last_secs = 0.0f64;
        let mut last_wall = Instant::now();
        loop {
            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .map_err(|e| GenerationError::encoding(format!("Failed reading ffmpeg progress: {e}")))?;
            if bytes == 0 {
                break;
            }

            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            latest.update(key, value);
            if key != "progress" {
                continue;
            }

            if latest.out_time_secs > last_secs + 0.001 {
                last_secs = latest.out_time_secs;
                last_wall = Instant::now();
            }
            if let Some(cb) = progress {
                cb(progress_report(
                    &latest,
                    total_frames,
                    expected_duration_secs,
                    start.elapsed().as_secs_f64(),
                ));
            }
            if last_wall.elapsed().as_secs() >= STALL_WARN_SECS {
                tracing::warn!(
                    out_time_secs = latest.out_time_secs,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for 10s"
                );
                last_wall = Instant::now();
            }
        }

        let status = child.wait()?;
        let stderr_output = join_drain(stderr_task);
        if !status.success() {
            return Err(failure("ffmpeg", status, &stderr_output));
        }

        if let Some(cb) = progress {
            cb(RenderProgress::complete(total_frames));
        }
        tracing::info!(
            frames = latest.frames,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "ffmpeg finished"
        );
        Ok(latest.frames)
    }
}

/// A child process that is killed and reaped unless waited on.
#[derive(Debug)]
pub(crate) struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    pub(crate) fn id(&self) -> u32 {
        self.child.as_ref().map(Child::id).unwrap_or_default()
    }

    pub(crate) fn stdout(&mut self) -> Option<std::process::ChildStdout> {
        self.child.as_mut()?.stdout.take()
    }

    pub(crate) fn stderr(&mut self) -> Option<ChildStderr> {
        self.child.as_mut()?.stderr.take()
    }

    pub(crate) fn stdin(&mut self) -> Option<std::process::ChildStdin> {
        self.child.as_mut()?.stdin.take()
    }

    pub(crate) fn wait(&mut self) -> GenerationResult<ExitStatus> {
        let Some(mut child) = self.child.take() else {
            return Err(GenerationError::encoding("ffmpeg process already reaped"));
        };
        child
            .wait()
            .map_err(|e| GenerationError::encoding(format!("Failed to wait on ffmpeg: {e}")))
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            tracing::debug!(pid = child.id(), "Killing abandoned ffmpeg process");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Read stderr on a separate thread so ffmpeg never blocks on a full pipe.
pub(crate) fn drain(stderr: ChildStderr) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(stderr);
        let mut output = String::new();
        match reader.read_to_string(&mut output) {
            Ok(_) => output,
            Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
        }
    })
}

pub(crate) fn join_drain(task: JoinHandle<String>) -> String {
    task.join()
        .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
}

pub(crate) fn failure(what: &str, status: ExitStatus, stderr: &str) -> GenerationError {
    GenerationError::encoding(format!(
        "{what} failed (status {status}): {}",
        stderr_tail(stderr.trim())
    ))
}

fn stderr_tail(stderr: &str) -> &str {
    let count = stderr.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return stderr;
    }
    let skip = count - STDERR_TAIL_CHARS;
    let byte = stderr
        .char_indices()
        .nth(skip)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &stderr[byte..]
}

/// Output codec arguments for `profile`.
pub fn codec_args(profile: &EncodingProfile) -> Vec<String> {
    let video_codec = match profile.codec {
        CodecPreset::H264 => "libx264",
        CodecPreset::H265 => "libx265",
    };

    let mut args: Vec<String> = vec![
        "-c:v".into(),
        video_codec.into(),
        "-preset".into(),
        profile.speed_preset.clone(),
    ];
    if profile.codec == CodecPreset::H264 {
        args.extend(["-profile:v".into(), "high".into()]);
    }
    args.extend([
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-b:v".into(),
        profile.video_bitrate.clone(),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        profile.audio_bitrate.clone(),
    ]);
    if profile.threads > 0 {
        args.extend(["-threads".into(), profile.threads.to_string()]);
    }
    args.extend(["-movflags".into(), "+faststart".into()]);
    args
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    frames: u64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both keys.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "frame" => {
                if let Ok(frames) = value.trim().parse() {
                    self.frames = frames;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    total_frames: u64,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> RenderProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    RenderProgress {
        progress: if state.complete { 1.0 } else { progress },
        frames_rendered: (progress * total_frames as f64).round() as u64,
        total_frames,
        eta_secs: eta(progress, elapsed_secs),
        stage: if state.complete {
            RenderStage::Finalizing
        } else {
            RenderStage::Rendering
        },
    }
}
