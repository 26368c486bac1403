//! Single-producer, single-consumer progress buffer.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use versereel_project_model::{EventKind, ProgressEvent};

/// Message delivered when a producer goes away without a terminal event.
pub const ABANDONED_MESSAGE: &str = "generation ended without reporting a result";

#[derive(Debug)]
struct State {
    buffer: VecDeque<ProgressEvent>,
    capacity: usize,
    last_percent: u8,
    closed: bool,
    finished_at: Option<Instant>,
    dropped: u64,
}

/// Bounded buffer with drop-oldest overflow. Producers never block.
#[derive(Debug)]
pub(crate) struct Channel {
    state: Mutex<State>,
    notify: Notify,
}

impl Channel {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                buffer: VecDeque::with_capacity(capacity.max(1)),
                capacity: capacity.max(1),
                last_percent: 0,
                closed: false,
                finished_at: None,
                dropped: 0,
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an event. Percentages are clamped so they never go down.
    /// Events after a terminal event are ignored.
    pub(crate) fn push(&self, mut event: ProgressEvent) {
        {
            let mut state = self.lock();
            if state.closed {
                tracing::trace!(stage = %event.stage, "Ignoring event on closed channel");
                return;
            }

            event.percentage = match event.kind {
                EventKind::Complete => 100,
                _ => event.percentage.max(state.last_percent).min(100),
            };
            state.last_percent = event.percentage;

            if state.buffer.len() >= state.capacity {
                // Only the final event can be terminal, so the oldest never is.
                state.buffer.pop_front();
                state.dropped += 1;
            }

            if event.is_terminal() {
                state.closed = true;
                state.finished_at = Some(Instant::now());
                if state.dropped > 0 {
                    tracing::debug!(dropped = state.dropped, "Progress events dropped by slow consumer");
                }
            }
            state.buffer.push_back(event);
        }
        self.notify.notify_one();
    }

    /// Close with a synthesized error if the producer never finished.
    pub(crate) fn abandon(&self) {
        let last = {
            let state = self.lock();
            if state.closed {
                return;
            }
            state.last_percent
        };
        tracing::warn!("Progress producer dropped without a terminal event");
        self.push(ProgressEvent::error(last, ABANDONED_MESSAGE));
    }

    /// Next event, waiting while the channel is open and empty.
    /// `None` once the terminal event has been taken.
    pub(crate) async fn recv(&self) -> Option<ProgressEvent> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.lock();
                if let Some(event) = state.buffer.pop_front() {
                    return Some(event);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub(crate) fn last_percent(&self) -> u8 {
        self.lock().last_percent
    }

    /// How long ago the terminal event was pushed, if it was.
    pub(crate) fn finished_for(&self) -> Option<Duration> {
        self.lock().finished_at.map(|t| t.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use versereel_project_model::Stage;

    #[tokio::test]
    async fn test_percentages_never_regress() {
        let ch = Channel::new(8);
        ch.push(ProgressEvent::progress(50, "a"));
        ch.push(ProgressEvent::progress(30, "b"));
        ch.push(ProgressEvent::complete("done"));

        let got: Vec<u8> = [
            ch.recv().await.unwrap(),
            ch.recv().await.unwrap(),
            ch.recv().await.unwrap(),
        ]
        .iter()
        .map(|e| e.percentage)
        .collect();
        assert_eq!(got, vec![50, 50, 100]);
        assert!(ch.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_overflow_drops_oldest_but_keeps_terminal() {
        let ch = Channel::new(3);
        for p in 0..10u8 {
            ch.push(ProgressEvent::progress(p * 5, "x"));
        }
        ch.push(ProgressEvent::complete("out.mp4"));

        let mut events = Vec::new();
        while let Some(e) = ch.recv().await {
            events.push(e);
        }
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].percentage, 40);
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_events_after_terminal_are_ignored() {
        let ch = Channel::new(4);
        ch.push(ProgressEvent::error(10, "boom"));
        ch.push(ProgressEvent::at(Stage::AudioReady));
        assert!(ch.recv().await.unwrap().is_terminal());
        assert!(ch.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_abandon_synthesizes_error() {
        let ch = Channel::new(4);
        ch.push(ProgressEvent::at(Stage::DownloadComplete));
        ch.abandon();
        let _ = ch.recv().await;
        let last = ch.recv().await.unwrap();
        assert_eq!(last.kind, EventKind::Error);
        assert_eq!(last.percentage, 25);
        assert_eq!(last.message.as_deref(), Some(ABANDONED_MESSAGE));
        assert!(ch.finished_for().is_some());
    }

    #[tokio::test]
    async fn test_recv_wakes_on_push() {
        let ch = std::sync::Arc::new(Channel::new(4));
        let reader = {
            let ch = ch.clone();
            tokio::spawn(async move { ch.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        ch.push(ProgressEvent::at(Stage::FetchComplete));
        let event = reader.await.unwrap().unwrap();
        assert_eq!(event.percentage, 10);
    }
}
