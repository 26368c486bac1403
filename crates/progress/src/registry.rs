//! Process-wide map from request id to progress channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use versereel_common::{GenerationError, ProgressConfig};
use versereel_project_model::{ProgressEvent, Stage};

use crate::channel::Channel;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressError {
    #[error("request id '{0}' is already in flight")]
    DuplicateId(String),

    #[error("no progress channel registered for '{0}'")]
    UnknownId(String),

    #[error("request id '{0}' already has a subscriber")]
    AlreadySubscribed(String),
}

impl From<ProgressError> for GenerationError {
    fn from(err: ProgressError) -> Self {
        GenerationError::invalid_input(err.to_string())
    }
}

#[derive(Debug)]
struct Entry {
    channel: Arc<Channel>,
    subscribed: bool,
}

/// Registry tuning, usually taken from [`ProgressConfig`].
#[derive(Debug, Clone, Copy)]
pub struct RegistryOptions {
    pub capacity: usize,
    pub subscribe_wait: Duration,
    pub retention: Duration,
}

impl From<&ProgressConfig> for RegistryOptions {
    fn from(config: &ProgressConfig) -> Self {
        Self {
            capacity: config.buffer_capacity,
            subscribe_wait: Duration::from_millis(config.subscribe_wait_ms),
            retention: Duration::from_secs(config.retention_secs),
        }
    }
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self::from(&ProgressConfig::default())
    }
}

#[derive(Debug, Default)]
struct Inner {
    /// Registrations a consumer can attach to.
    entries: HashMap<String, Entry>,
    /// Channels whose producer has not finished, whether or not they are
    /// still subscribable. An id stays reserved here until its sender
    /// completes, fails, or is dropped.
    producers: HashMap<String, Arc<Channel>>,
}

/// Lock-protected registry of in-flight progress channels.
#[derive(Debug)]
pub struct ProgressRegistry {
    inner: Mutex<Inner>,
    registered: Notify,
    options: RegistryOptions,
}

impl ProgressRegistry {
    pub fn new(options: RegistryOptions) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            registered: Notify::new(),
            options,
        })
    }

    pub fn from_config(config: &ProgressConfig) -> Arc<Self> {
        Self::new(RegistryOptions::from(config))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create the channel for `id` and hand back its producer end.
    ///
    /// Finished channels nobody subscribed to are swept once they are older
    /// than the retention window. An id cannot be registered again while its
    /// producer is still running, even after its subscriber has gone away,
    /// or while its finished channel is still being read.
    pub fn register(&self, id: &str) -> Result<ProgressSender, ProgressError> {
        let channel = {
            let mut inner = self.lock();
            inner.producers.retain(|_, channel| !channel.is_closed());
            if inner.producers.contains_key(id) {
                return Err(ProgressError::DuplicateId(id.to_string()));
            }

            let retention = self.options.retention;
            let entries = &mut inner.entries;
            entries.retain(|key, entry| {
                let stale = !entry.subscribed
                    && entry.channel.finished_for().is_some_and(|age| age >= retention);
                if stale {
                    tracing::debug!(id = %key, "Sweeping unclaimed progress channel");
                }
                !stale
            });

            if let Some(existing) = entries.get(id) {
                if existing.subscribed || !existing.channel.is_closed() {
                    return Err(ProgressError::DuplicateId(id.to_string()));
                }
            }

            let channel = Arc::new(Channel::new(self.options.capacity));
            entries.insert(
                id.to_string(),
                Entry {
                    channel: channel.clone(),
                    subscribed: false,
                },
            );
            inner.producers.insert(id.to_string(), channel.clone());
            channel
        };

        self.registered.notify_waiters();
        tracing::debug!(id, "Registered progress channel");

        let sender = ProgressSender {
            id: id.to_string(),
            channel,
        };
        sender.stage(Stage::Start);
        Ok(sender)
    }

    /// Subscribe to `id`, waiting up to the configured time for it to appear.
    pub async fn subscribe(self: &Arc<Self>, id: &str) -> Result<Subscription, ProgressError> {
        self.subscribe_within(id, self.options.subscribe_wait).await
    }

    /// Subscribe to `id`, waiting up to `wait` for it to be registered.
    pub async fn subscribe_within(
        self: &Arc<Self>,
        id: &str,
        wait: Duration,
    ) -> Result<Subscription, ProgressError> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let notified = self.registered.notified();
            tokio::pin!(notified);
            // Register interest before checking, so a registration between
            // the check and the await is not missed.
            notified.as_mut().enable();

            if let Some(subscription) = self.try_attach(id)? {
                return Ok(subscription);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                tracing::debug!(id, "Subscription timed out waiting for registration");
                return Err(ProgressError::UnknownId(id.to_string()));
            }
        }
    }

    fn try_attach(self: &Arc<Self>, id: &str) -> Result<Option<Subscription>, ProgressError> {
        let mut inner = self.lock();
        let Some(entry) = inner.entries.get_mut(id) else {
            return Ok(None);
        };
        if entry.subscribed {
            return Err(ProgressError::AlreadySubscribed(id.to_string()));
        }
        entry.subscribed = true;
        Ok(Some(Subscription {
            id: id.to_string(),
            channel: entry.channel.clone(),
            registry: Arc::clone(self),
            finished: false,
        }))
    }

    /// Drop the registration for `id`. A producer that is still running
    /// keeps the id reserved until it finishes.
    pub fn remove(&self, id: &str) {
        if self.lock().entries.remove(id).is_some() {
            tracing::debug!(id, "Removed progress channel");
        }
    }

    /// Whether a consumer can still attach to `id`.
    pub fn is_registered(&self, id: &str) -> bool {
        self.lock().entries.contains_key(id)
    }

    /// Whether the producer for `id` is still running.
    pub fn is_in_flight(&self, id: &str) -> bool {
        self.lock()
            .producers
            .get(id)
            .is_some_and(|channel| !channel.is_closed())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}

/// Producer end of a request's channel. Never blocks.
///
/// Dropping a sender that has not sent a terminal event closes the channel
/// with a synthesized error.
#[derive(Debug)]
pub struct ProgressSender {
    id: String,
    channel: Arc<Channel>,
}

impl ProgressSender {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn send(&self, event: ProgressEvent) {
        self.channel.push(event);
    }

    pub fn stage(&self, stage: Stage) {
        self.send(ProgressEvent::at(stage));
    }

    /// Report encoder progress as a 0.0..=1.0 fraction.
    pub fn encoding(&self, fraction: f64) {
        self.send(ProgressEvent::progress(
            Stage::encoding_percent(fraction),
            Stage::Encoding.label(),
        ));
    }

    pub fn last_percent(&self) -> u8 {
        self.channel.last_percent()
    }

    pub fn complete(self, message: impl Into<String>) {
        self.send(ProgressEvent::complete(message));
    }

    pub fn fail(self, message: impl Into<String>) {
        let last = self.last_percent();
        self.send(ProgressEvent::error(last, message));
    }
}

impl Drop for ProgressSender {
    fn drop(&mut self) {
        self.channel.abandon();
    }
}

/// Consumer end of a request's channel.
///
/// The registration is removed when the subscription is dropped, whether
/// or not the stream reached its terminal event.
#[derive(Debug)]
pub struct Subscription {
    id: String,
    channel: Arc<Channel>,
    registry: Arc<ProgressRegistry>,
    finished: bool,
}

impl Subscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Next event in emission order, or `None` after the terminal event.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        if self.finished {
            return None;
        }
        let event = self.channel.recv().await;
        match &event {
            Some(e) if e.is_terminal() => self.finished = true,
            None => self.finished = true,
            _ => {}
        }
        event
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}
