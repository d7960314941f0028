//! Completion accounting shared by every pipeline task

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ResizeError, Result};

/// Thread-safe counters updated by load and resize tasks as they finish
#[derive(Debug)]
pub struct BatchTally {
    started: Instant,
    sources: usize,
    loaded: AtomicUsize,
    load_failed: AtomicUsize,
    tasks: AtomicUsize,
    written: AtomicUsize,
    write_failed: AtomicUsize,
    skipped_zero: AtomicUsize,
    cancelled: AtomicUsize,
}

/// Final counts for one batch. Counts only; errors are logged where they happen.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub sources: usize,
    pub loaded: usize,
    pub load_failed: usize,
    pub tasks: usize,
    pub written: usize,
    pub write_failed: usize,
    pub skipped_zero: usize,
    pub cancelled: usize,
    #[serde(serialize_with = "serialize_millis", rename = "elapsed_ms")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

impl BatchTally {
    pub fn new(sources: usize) -> Self {
        Self {
            started: Instant::now(),
            sources,
            loaded: AtomicUsize::new(0),
            load_failed: AtomicUsize::new(0),
            tasks: AtomicUsize::new(0),
            written: AtomicUsize::new(0),
            write_failed: AtomicUsize::new(0),
            skipped_zero: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
        }
    }

    /// Record the outcome of one load attempt
    pub fn load_finished<T>(&self, result: &Result<T>) {
        let counter = match result {
            Ok(_) => &self.loaded,
            Err(ResizeError::Cancelled { .. }) => &self.cancelled,
            Err(_) => &self.load_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that the dispatcher spawned one resize task
    pub fn task_spawned(&self) {
        self.tasks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one resize task
    pub fn task_finished<T>(&self, result: &Result<T>) {
        let counter = match result {
            Ok(_) => &self.written,
            Err(ResizeError::ZeroBoundingBox { .. }) => &self.skipped_zero,
            Err(ResizeError::Cancelled { .. }) => &self.cancelled,
            Err(_) => &self.write_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            sources: self.sources,
            loaded: self.loaded.load(Ordering::Relaxed),
            load_failed: self.load_failed.load(Ordering::Relaxed),
            tasks: self.tasks.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            write_failed: self.write_failed.load(Ordering::Relaxed),
            skipped_zero: self.skipped_zero.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            elapsed: self.started.elapsed(),
        }
    }
}

impl BatchSummary {
    /// Items that did not produce their output
    pub fn failures(&self) -> usize {
        self.load_failed + self.write_failed + self.skipped_zero + self.cancelled
    }

    pub fn log(&self) {
        info!(
            "Batch complete: {} of {} sources loaded, {} of {} variants written in {:.2}s",
            self.loaded,
            self.sources,
            self.written,
            self.tasks,
            self.elapsed.as_secs_f64()
        );
        if self.failures() > 0 {
            warn!(
                "{} load failures, {} write failures, {} zero-size skips, {} cancelled",
                self.load_failed, self.write_failed, self.skipped_zero, self.cancelled
            );
        }
    }
}
