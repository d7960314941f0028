//! Core image processing: decoding sources and writing resized variants

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

use crate::config::SizeTarget;
use crate::error::{ErrorContext, Result, ResizeError};

pub mod formats;
pub mod resize;
pub mod validation;

pub use formats::*;
pub use resize::*;
pub use validation::*;

/// A decoded source image, never mutated after creation
#[derive(Debug)]
pub struct DecodedImage {
    pub image: image::DynamicImage,
    /// Source file name without its extension
    pub base_name: String,
    pub source: PathBuf,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Read and decode one source file
pub async fn load_image(path: &Path) -> Result<DecodedImage> {
    let data = fs::read(path).await.with_file_context(path)?;

    let image = tokio::task::spawn_blocking(move || decode_jpeg(&data))
        .await
        .map_err(|e| ResizeError::task_failed(format!("decode join error: {}", e)))??;

    debug!("Loaded image: {}x{} from {:?}", image.width(), image.height(), path);

    Ok(DecodedImage {
        image,
        base_name: base_name(path),
        source: path.to_path_buf(),
    })
}

/// One (image, size) pair bound to its destination file
#[derive(Debug, Clone)]
pub struct ResizeTask {
    pub image: Arc<DecodedImage>,
    pub size: SizeTarget,
    pub destination: PathBuf,
}

/// Result of a written variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenVariant {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl ResizeTask {
    pub fn new(image: Arc<DecodedImage>, size: SizeTarget, destination: &Path) -> Self {
        Self {
            image,
            size,
            destination: destination.to_path_buf(),
        }
    }

    /// `<destination>/<base>_<size>.jpg`
    pub fn output_path(&self) -> PathBuf {
        self.destination.join(output_file_name(&self.image.base_name, self.size))
    }

    /// Create the output file, resize, and encode into it.
    ///
    /// Blocking; call from the blocking pool. A zero-sized box is rejected
    /// before the file is created. An encode failure may leave a partial file.
    pub fn write(&self, quality: u8) -> Result<WrittenVariant> {
        let path = self.output_path();

        if self.size.is_zero() {
            return Err(ResizeError::ZeroBoundingBox { file: path });
        }

        let file = File::create(&path).with_file_context(&path)?;

        let resized = resize_to_fit(&self.image.image, self.size)
            .ok_or_else(|| ResizeError::ZeroBoundingBox { file: path.clone() })?;

        encode_jpeg(&resized, file, quality).with_file_context(&path)?;

        Ok(WrittenVariant {
            path,
            width: resized.width(),
            height: resized.height(),
        })
    }
}
