//! VerseReel Common Utilities
//!
//! Shared infrastructure for all VerseReel crates:
//! - Error taxonomy and result aliases
//! - Configuration loading
//! - Tracing/logging initialization
//! - Temporary workspace and directory purge helpers
//! - Media probing via ffprobe

pub mod config;
pub mod error;
pub mod fs;
pub mod logging;
pub mod media;

pub use config::*;
pub use error::*;
pub use media::{MediaProbe, VideoInfo};
