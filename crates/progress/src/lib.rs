//! VerseReel Progress
//!
//! Streams percentage/stage events from a blocking generation worker to an
//! async consumer, keyed by request id.
//!
//! A [`ProgressRegistry`] owns one bounded channel per id. The worker holds
//! the [`ProgressSender`]; the consumer holds a [`Subscription`]. Either side
//! can go away early: a dropped sender yields a terminal error event, and a
//! dropped subscription removes the registration.

mod channel;
pub mod registry;

pub use channel::ABANDONED_MESSAGE;
pub use registry::{ProgressError, ProgressRegistry, ProgressSender, RegistryOptions, Subscription};
