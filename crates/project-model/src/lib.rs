//! VerseReel Project Model
//!
//! Defines the core data contracts shared by the pipeline crates:
//! - **Request:** scripture range, editions, background, platform and tier
//! - **Canvas:** even-sided output geometry derived from the request
//! - **Segment/Timeline:** resolved narration units with cumulative offsets
//! - **Overlay:** bilingual, time-bounded subtitle blocks
//! - **Progress:** checkpoint events streamed to subscribers
//!
//! Times are seconds as `f64`; pixel geometry is `f32` in canvas space.

pub mod canvas;
pub mod overlay;
pub mod progress;
pub mod request;
pub mod segment;

pub use canvas::*;
pub use overlay::*;
pub use progress::*;
pub use request::*;
pub use segment::*;
