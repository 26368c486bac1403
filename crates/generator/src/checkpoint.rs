//! Milestone progress reporting for a single generation.

use std::cell::Cell;

use versereel_project_model::{ProgressEvent, Stage};

/// Receives every progress event of a generation, terminal ones included.
pub type ProgressSink<'a> = &'a (dyn Fn(&ProgressEvent) + Sync);

/// Emits stage events to an optional sink, never letting the percentage
/// go backwards and skipping encoder updates that do not move it.
pub struct Checkpoints<'a> {
    sink: Option<ProgressSink<'a>>,
    last: Cell<Option<u8>>,
}

impl<'a> Checkpoints<'a> {
    pub fn new(sink: Option<ProgressSink<'a>>) -> Self {
        Self {
            sink,
            last: Cell::new(None),
        }
    }

    pub fn last_percent(&self) -> u8 {
        self.last.get().unwrap_or(0)
    }

    pub fn stage(&self, stage: Stage) {
        self.emit(ProgressEvent::at(stage));
    }

    /// Map an encoder fraction onto the encoding band.
    pub fn encoding(&self, fraction: f64) {
        let percent = Stage::encoding_percent(fraction);
        if self.last.get().is_some_and(|last| percent <= last) {
            return;
        }
        self.emit(ProgressEvent::progress(percent, Stage::Encoding.label()));
    }

    pub fn complete(&self, message: impl Into<String>) {
        self.emit(ProgressEvent::complete(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(ProgressEvent::error(self.last_percent(), message));
    }

    fn emit(&self, mut event: ProgressEvent) {
        event.percentage = event.percentage.max(self.last_percent()).min(100);
        self.last.set(Some(event.percentage));
        tracing::debug!(percent = event.percentage, stage = %event.stage, "Checkpoint");
        if let Some(sink) = self.sink {
            sink(&event);
        }
    }
}
