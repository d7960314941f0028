//! Load stage: decode every source concurrently onto the image stream

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{Result, ResizeError};
use crate::parallel::{BatchTally, Cancellation};
use crate::processing::{load_image, DecodedImage};

/// A decoded source on its way to the resize stage.
///
/// `slot` is a residency permit: it stays taken until every resize task
/// sharing this image has finished, so at most as many images as there are
/// residency permits are ever decoded at once.
#[derive(Debug)]
pub struct LoadedImage {
    pub image: DecodedImage,
    pub slot: OwnedSemaphorePermit,
}

/// Spawn one load task per source and wait for all of them.
///
/// Successful decodes are sent on `images`. The stream closes once every
/// task has finished, since each task owns a clone of the only senders.
pub async fn run_loader(
    sources: Vec<PathBuf>,
    images: mpsc::Sender<LoadedImage>,
    pool: Arc<Semaphore>,
    residency: Arc<Semaphore>,
    cancel: Cancellation,
    tally: Arc<BatchTally>,
) {
    let mut tasks = JoinSet::new();

    for path in sources {
        let images = images.clone();
        let pool = Arc::clone(&pool);
        let residency = Arc::clone(&residency);
        let cancel = cancel.clone();
        let tally = Arc::clone(&tally);

        tasks.spawn(async move {
            let result = load_with_permit(&path, &pool, residency, &cancel).await;
            tally.load_finished(&result);

            match result {
                Ok(loaded) => {
                    if images.send(loaded).await.is_err() {
                        warn!("image stream closed before {} was dispatched", path.display());
                    }
                }
                Err(e) => error!("{}", e),
            }
        });
    }
    drop(images);

    join_loads(tasks, &tally).await;
    debug!("Load stage complete");
}

/// Wait for every load task. One that panicked or was aborted counts as a
/// failed load.
async fn join_loads(mut tasks: JoinSet<()>, tally: &BatchTally) {
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("load task did not complete: {}", e);
            tally.load_finished::<()>(&Err(ResizeError::task_failed(e.to_string())));
        }
    }
}

/// The pool permit is released before the caller sends on the stream; the
/// residency slot travels with the image.
async fn load_with_permit(
    path: &Path,
    pool: &Semaphore,
    residency: Arc<Semaphore>,
    cancel: &Cancellation,
) -> Result<LoadedImage> {
    let slot = residency
        .acquire_owned()
        .await
        .map_err(|e| ResizeError::task_failed(e.to_string()))?;
    let _permit = pool
        .acquire()
        .await
        .map_err(|e| ResizeError::task_failed(e.to_string()))?;

    if cancel.is_cancelled() {
        return Err(ResizeError::Cancelled { file: path.to_path_buf() });
    }

    info!("reading {}", path.display());
    let image = load_image(path).await?;
    Ok(LoadedImage { image, slot })
}
