//! VerseReel Generator
//!
//! The `generate(request) -> path` entry point and its plumbing:
//! - **Pipeline:** timeline → narration → background → layout → render
//! - **Checkpoints:** milestone progress events for an optional sink
//! - **Naming:** output file and temporary workspace names
//! - **Worker:** run a generation on a blocking thread, publishing its
//!   progress to a [`ProgressRegistry`](versereel_progress::ProgressRegistry)

pub mod checkpoint;
pub mod naming;
pub mod pipeline;
pub mod worker;

pub use checkpoint::{Checkpoints, ProgressSink};
pub use naming::{output_file_name, workspace_key};
pub use pipeline::{Generator, GeneratorParts};
pub use worker::{spawn_generation, GenerationHandle};
