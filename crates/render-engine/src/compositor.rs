//! In-process frame compositor.
//!
//! A decoder ffmpeg produces adapted background frames as raw RGBA on
//! stdout. Each frame gets the active overlay blended on, then goes to an
//! encoder ffmpeg on stdin together with the narration track.

use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::process::Stdio;
use std::time::Instant;

use image::RgbaImage;
use versereel_common::{GenerationError, GenerationResult};

use crate::backend::RendererBackend;
use crate::ffmpeg::{codec_args, drain, failure, join_drain, FfmpegRunner};
use crate::job::{ProgressCallback, RenderJob, RenderProgress};
use crate::sprite::OverlaySprite;

/// Composes frames in this process.
#[derive(Debug, Clone)]
pub struct CompositorBackend {
    runner: FfmpegRunner,
}

impl CompositorBackend {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }
}

impl RendererBackend for CompositorBackend {
    fn render(&self, job: &RenderJob, progress: Option<ProgressCallback<'_>>) -> GenerationResult<()> {
        let total_frames = job.total_frames();
        if let Some(cb) = &progress {
            cb(RenderProgress::preparing(total_frames));
        }

        let (width, height) = (job.canvas.width, job.canvas.height);
        let frame_len = width as usize * height as usize * 4;
        let started = Instant::now();

        let mut decoder_cmd = self.runner.command();
        decoder_cmd
            .args(decoder_args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut decoder = self.runner.spawn(&mut decoder_cmd)?;

        let mut encoder_cmd = self.runner.command();
        encoder_cmd
            .args(encoder_args(job))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        let mut encoder = self.runner.spawn(&mut encoder_cmd)?;
        tracing::info!(
            decoder_pid = decoder.id(),
            encoder_pid = encoder.id(),
            total_frames,
            "Compositor started"
        );

        let frames_out = decoder
            .stdout()
            .ok_or_else(|| GenerationError::encoding("Failed to capture decoder stdout"))?;
        let decoder_err = drain(
            decoder
                .stderr()
                .ok_or_else(|| GenerationError::encoding("Failed to capture decoder stderr"))?,
        );
        let encoder_err = drain(
            encoder
                .stderr()
                .ok_or_else(|| GenerationError::encoding("Failed to capture encoder stderr"))?,
        );
        let frames_in = encoder
            .stdin()
            .ok_or_else(|| GenerationError::encoding("Failed to capture encoder stdin"))?;

        let mut reader = BufReader::with_capacity(frame_len, frames_out);
        let mut writer = BufWriter::with_capacity(frame_len, frames_in);
        let mut buffer = vec![0u8; frame_len];
        let fps = job.profile.fps.max(1) as f64;
        let report_every = job.profile.fps.max(1) as u64;
        let mut written = 0u64;

        let pumped: GenerationResult<()> = loop {
            if written >= total_frames {
                break Ok(());
            }
            match reader.read_exact(&mut buffer) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break Ok(()),
                Err(e) => {
                    break Err(GenerationError::encoding(format!("Failed reading decoded frame: {e}")))
                }
            }

            let t = written as f64 / fps;
            let Some(frame) = RgbaImage::from_raw(width, height, std::mem::take(&mut buffer)) else {
                break Err(GenerationError::encoding("Decoded frame has unexpected size"));
            };
            let frame = compose_frame(frame, &job.sprites, t);

            if let Err(e) = writer.write_all(frame.as_raw()) {
                break Err(GenerationError::encoding(format!("Failed writing frame to encoder: {e}")));
            }
            buffer = frame.into_raw();
            written += 1;

            if written % report_every == 0 {
                if let Some(cb) = &progress {
                    cb(RenderProgress::rendering(
                        written,
                        total_frames,
                        started.elapsed().as_secs_f64(),
                    ));
                }
            }
        };

        // Closing stdin lets the encoder finish the file.
        let flushed = writer
            .into_inner()
            .map(drop)
            .map_err(|e| GenerationError::encoding(format!("Failed flushing encoder input: {}", e.error())));
        drop(reader);

        let decoder_status = decoder.wait()?;
        let encoder_status = encoder.wait()?;
        let decoder_log = join_drain(decoder_err);
        let encoder_log = join_drain(encoder_err);

        if !encoder_status.success() {
            return Err(failure("ffmpeg encoder", encoder_status, &encoder_log));
        }
        pumped?;
        flushed?;
        if !decoder_status.success() && written < total_frames {
            return Err(failure("ffmpeg decoder", decoder_status, &decoder_log));
        }
        job.check_frames_written(written)?;

        if let Some(cb) = &progress {
            cb(RenderProgress::complete(total_frames));
        }
        tracing::info!(
            frames = written,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Compositor finished"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.runner.is_available()
    }

    fn name(&self) -> &str {
        "compositor"
    }
}

/// Index of the sprite visible at `t`, if any. Sprites are ordered and
/// their windows do not overlap.
pub fn active_sprite(sprites: &[OverlaySprite], t: f64) -> Option<usize> {
    let i = sprites.partition_point(|s| s.end_secs <= t);
    sprites
        .get(i)
        .filter(|s| s.is_visible_at(t))
        .map(|_| i)
}

/// Blend the sprite active at `t` onto `frame`.
pub fn compose_frame(mut frame: RgbaImage, sprites: &[OverlaySprite], t: f64) -> RgbaImage {
    if let Some(i) = active_sprite(sprites, t) {
        let sprite = &sprites[i];
        image::imageops::overlay(&mut frame, &sprite.image, sprite.x as i64, sprite.y as i64);
    }
    frame
}

/// Decoder: adapted background as raw RGBA frames, capped at the total.
pub fn decoder_args(job: &RenderJob) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
    ];
    args.extend(job.background.input_args(&job.background_path));
    args.extend([
        "-vf".into(),
        job.background.filter_chain(),
        "-t".into(),
        format!("{:.3}", job.total_secs),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "pipe:1".into(),
    ]);
    args
}

/// Encoder: raw RGBA from stdin plus the narration track.
pub fn encoder_args(job: &RenderJob) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "-s".into(),
        job.canvas.to_string(),
        "-r".into(),
        job.profile.fps.to_string(),
        "-i".into(),
        "pipe:0".into(),
        "-i".into(),
        job.audio_path.to_string_lossy().into_owned(),
        "-map".into(),
        "0:v".into(),
        "-map".into(),
        "1:a".into(),
    ];
    args.extend(codec_args(&job.profile));
    args.extend([
        "-t".into(),
        format!("{:.3}", job.total_secs),
        job.output_path.to_string_lossy().into_owned(),
    ]);
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{job_with_sprites, solid_sprite};

    #[test]
    fn test_active_sprite_uses_half_open_windows() {
        let sprites = vec![solid_sprite(0.0, 2.0), solid_sprite(2.0, 3.5)];
        assert_eq!(active_sprite(&sprites, 0.0), Some(0));
        assert_eq!(active_sprite(&sprites, 1.999), Some(0));
        assert_eq!(active_sprite(&sprites, 2.0), Some(1));
        assert_eq!(active_sprite(&sprites, 3.5), None);
        assert_eq!(active_sprite(&[], 1.0), None);
    }

    #[test]
    fn test_gap_between_sprites_shows_nothing() {
        let sprites = vec![solid_sprite(0.0, 1.0), solid_sprite(2.0, 3.0)];
        assert_eq!(active_sprite(&sprites, 1.5), None);
    }

    #[test]
    fn test_compose_frame_blends_only_active_sprite_region() {
        let sprites = vec![solid_sprite(0.0, 2.0)];
        let frame = RgbaImage::from_pixel(720, 1280, image::Rgba([10, 20, 30, 255]));

        let out = compose_frame(frame.clone(), &sprites, 1.0);
        assert_eq!(out.get_pixel(5, 605).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(5, 10).0, [10, 20, 30, 255]);

        let later = compose_frame(frame, &sprites, 2.0);
        assert_eq!(later.get_pixel(5, 605).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_decoder_and_encoder_args() {
        let job = job_with_sprites(&[(0.0, 5.5)]);
        let decoder = decoder_args(&job).join(" ");
        assert!(decoder.contains("-f rawvideo -pix_fmt rgba pipe:1"));
        assert!(decoder.contains("-t 5.500"));
        assert!(decoder.contains(&job.background.filter_chain()));

        let encoder = encoder_args(&job).join(" ");
        assert!(encoder.contains("-s 720x1280 -r 24 -i pipe:0 -i /w/narration.wav"));
        assert!(encoder.contains("-map 0:v -map 1:a"));
        assert!(encoder.ends_with("-t 5.500 /out/recitation.mp4"));
    }
}
