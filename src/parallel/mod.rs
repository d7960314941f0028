//! Concurrent batch pipeline: load stage -> resize stage -> final completion
//!
//! Every load and resize task is spawned immediately, one per item. Two
//! semaphores gate them:
//!
//! - the worker pool: a load or resize must hold a permit before it opens a
//!   file or produces a raster, bounding concurrent I/O and CPU work;
//! - residency: a load takes a slot before decoding and the slot is only
//!   returned once every resize of that image has finished.
//!
//! At most `pool_size` decoded sources are alive at once, plus at most
//! `pool_size` resized rasters, however large the batch is.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch, Semaphore};
use tracing::{error, info};

use crate::config::{ProcessingConfig, SizeList};

pub mod dispatcher;
pub mod loader;
pub mod tally;

pub use dispatcher::*;
pub use loader::*;
pub use tally::*;

/// Read side of an optional cancel flag
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Option<watch::Receiver<bool>>);

impl Cancellation {
    /// A flag that never fires
    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

impl From<watch::Receiver<bool>> for Cancellation {
    fn from(rx: watch::Receiver<bool>) -> Self {
        Self(Some(rx))
    }
}

/// Wires the load stage into the resize stage and waits for both
pub struct Pipeline {
    destination: PathBuf,
    sizes: SizeList,
    pool_size: usize,
    stream_capacity: usize,
    quality: u8,
    cancel: Cancellation,
}

impl Pipeline {
    /// `destination` must exist and `sizes` be non-empty; neither is re-checked.
    pub fn new(destination: &Path, sizes: SizeList, processing: &ProcessingConfig) -> Self {
        Self {
            destination: destination.to_path_buf(),
            sizes,
            pool_size: processing.pool_size(),
            stream_capacity: processing.stream_capacity(),
            quality: processing.quality,
            cancel: Cancellation::none(),
        }
    }

    /// Stop starting new work once `cancel` reads `true`
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel.into();
        self
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Resize every source to every size. Returns once every spawned load
    /// and resize task has reported, whatever the outcome.
    pub async fn run(&self, sources: Vec<PathBuf>) -> BatchSummary {
        info!(
            "Resizing {} sources to {} sizes with {} workers",
            sources.len(),
            self.sizes.len(),
            self.pool_size
        );

        let pool = Arc::new(Semaphore::new(self.pool_size));
        let residency = Arc::new(Semaphore::new(self.pool_size));
        let tally = Arc::new(BatchTally::new(sources.len()));
        let (image_tx, image_rx) = mpsc::channel(self.stream_capacity);
        let (done_tx, done_rx) = oneshot::channel();

        let loader = tokio::spawn(run_loader(
            sources,
            image_tx,
            Arc::clone(&pool),
            residency,
            self.cancel.clone(),
            Arc::clone(&tally),
        ));

        let dispatcher = Dispatcher {
            sizes: self.sizes.clone(),
            destination: self.destination.clone(),
            quality: self.quality,
            pool,
            cancel: self.cancel.clone(),
            tally: Arc::clone(&tally),
        };
        tokio::spawn(dispatcher.run(image_rx, done_tx));

        if done_rx.await.is_err() {
            error!("resize stage exited without signalling completion");
        }
        // The stream only closes after the last load task, so this is already done
        if let Err(e) = loader.await {
            error!("load stage did not complete: {}", e);
        }

        let summary = tally.summary();
        summary.log();
        summary
    }
}
