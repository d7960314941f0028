//! Resize stage: one worker per (image, size), joined before the final signal

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::SizeList;
use crate::error::{Result, ResizeError};
use crate::parallel::{BatchTally, Cancellation, LoadedImage};
use crate::processing::{ResizeTask, WrittenVariant};

/// Fans decoded images out to resize workers
pub struct Dispatcher {
    pub sizes: SizeList,
    pub destination: PathBuf,
    pub quality: u8,
    pub pool: Arc<Semaphore>,
    pub cancel: Cancellation,
    pub tally: Arc<BatchTally>,
}

impl Dispatcher {
    /// Consume `images` until the load stage closes it, then wait for every
    /// spawned worker and fire `done` exactly once.
    pub async fn run(self, mut images: mpsc::Receiver<LoadedImage>, done: oneshot::Sender<()>) {
        let mut workers = JoinSet::new();
        let mut expected = 0usize;

        while let Some(LoadedImage { image, slot }) = images.recv().await {
            let image = Arc::new(image);
            let slot = Arc::new(slot);
            for size in self.sizes.iter() {
                let task = ResizeTask::new(Arc::clone(&image), size, &self.destination);
                expected += 1;
                self.tally.task_spawned();
                workers.spawn(resize_worker(
                    task,
                    self.quality,
                    Arc::clone(&self.pool),
                    Arc::clone(&slot),
                    self.cancel.clone(),
                    Arc::clone(&self.tally),
                ));
            }
        }

        debug!("Image stream closed; waiting for {} resize tasks", expected);
        self.finish(workers, expected, done).await;
    }

    /// Join every worker, counting one that panicked or was aborted as a
    /// failed write, then signal completion.
    async fn finish(&self, mut workers: JoinSet<()>, expected: usize, done: oneshot::Sender<()>) {
        let mut completed = 0usize;
        while let Some(joined) = workers.join_next().await {
            completed += 1;
            if let Err(e) = joined {
                error!("resize task did not complete: {}", e);
                self.tally.task_finished::<()>(&Err(ResizeError::task_failed(e.to_string())));
            }
        }
        debug_assert_eq!(completed, expected);

        if done.send(()).is_err() {
            debug!("Coordinator stopped waiting before completion");
        }
    }
}

/// Resize one image to one size and write it. Failures are logged and
/// counted, never returned. `_slot` keeps the source's residency permit
/// taken until this worker is done.
pub async fn resize_worker(
    task: ResizeTask,
    quality: u8,
    pool: Arc<Semaphore>,
    _slot: Arc<OwnedSemaphorePermit>,
    cancel: Cancellation,
    tally: Arc<BatchTally>,
) {
    let result = write_with_permit(task, quality, &pool, &cancel).await;
    tally.task_finished(&result);

    match result {
        Ok(variant) => debug!(
            "wrote {} ({}x{})",
            variant.path.display(),
            variant.width,
            variant.height
        ),
        Err(e) => error!("{}", e),
    }
}

async fn write_with_permit(
    task: ResizeTask,
    quality: u8,
    pool: &Semaphore,
    cancel: &Cancellation,
) -> Result<WrittenVariant> {
    let _permit = pool
        .acquire()
        .await
        .map_err(|e| ResizeError::task_failed(e.to_string()))?;

    if cancel.is_cancelled() {
        return Err(ResizeError::Cancelled { file: task.output_path() });
    }

    if !task.size.is_zero() {
        info!("creating {}", task.output_path().display());
    }

    tokio::task::spawn_blocking(move || task.write(quality))
        .await
        .map_err(|e| ResizeError::task_failed(format!("resize join error: {}", e)))?
}
