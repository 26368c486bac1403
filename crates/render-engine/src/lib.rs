//! VerseReel Render Engine
//!
//! Turns a resolved timeline into a finished video. Overlays are
//! rasterized once, then one of two interchangeable backends composes
//! them over the adapted background with the narration track.
//!
//! # Pipeline Architecture
//!
//! ```text
//! audio_*.mp3 ──── concat ──► narration.wav ─────────────┐
//!                                                        │
//! background.mp4 ── rotate/scale/crop/loop/trim ──┐      │
//!                                                 ├── compose ──► encode ──► output.mp4
//! overlays ── rasterize ──► sprites ──────────────┘
//! ```
//!
//! The filter-graph backend hands everything to one ffmpeg process; the
//! compositor decodes frames, blends sprites in-process, and pipes the
//! result to an encoder.

pub mod audio;
pub mod backend;
pub mod compositor;
pub mod ffmpeg;
pub mod filter_graph;
pub mod job;
pub mod output;
pub mod sprite;

pub use audio::{concat_narration, NarrationJoiner};
pub use backend::{backend_for, render_job, RendererBackend};
pub use compositor::CompositorBackend;
pub use ffmpeg::{codec_args, FfmpegRunner};
pub use filter_graph::FilterGraphBackend;
pub use job::{ProgressCallback, RenderJob, RenderProgress, RenderStage};
pub use output::OutputGuard;
pub use sprite::{rasterize, rasterize_all, OverlaySprite};
