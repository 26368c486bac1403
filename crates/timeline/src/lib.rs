//! VerseReel Timeline
//!
//! Turns a [`GenerationRequest`](versereel_project_model::GenerationRequest)
//! into a resolved narration [`Timeline`](versereel_project_model::Timeline):
//! - **Provider:** scripture text/audio query and envelope parsing
//! - **Fetch:** asset download to local files
//! - **Builder:** unit pairing, range filtering, audio resolution

pub mod builder;
pub mod fetch;
pub mod provider;

pub use builder::{PendingUnit, TimelineBuilder};
pub use fetch::{AssetFetcher, HttpFetcher, LocalFetcher, RoutingFetcher};
pub use provider::{HttpProvider, ScriptureProvider};
