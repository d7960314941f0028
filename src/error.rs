//! Error types and handling for resize-images

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for resize-images operations
pub type Result<T> = std::result::Result<T, ResizeError>;

/// Main error type for resize-images operations
#[derive(Debug, Error)]
pub enum ResizeError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Image decode or encode errors
    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// A token in the size list is not a non-negative integer
    #[error("{token:?} is not a valid size: {reason}")]
    InvalidSize { token: String, reason: String },

    /// The size list parsed to nothing
    #[error("no sizes specified")]
    NoSizes,

    /// The source directory holds no candidate images
    #[error("no images to resize in {}", dir.display())]
    NoSources { dir: PathBuf },

    /// A directory that must exist does not
    #[error("directory {} doesn't exist", path.display())]
    DirectoryMissing { path: PathBuf },

    /// A path expected to be a directory is something else
    #[error("{} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    /// A zero-sized bounding box was requested for an image
    #[error("cannot fit {} into a 0x0 box", file.display())]
    ZeroBoundingBox { file: PathBuf },

    /// A spawned task failed to complete (panic or runtime shutdown)
    #[error("Task failed: {message}")]
    TaskFailed { message: String },

    /// The batch was cancelled before this item started
    #[error("cancelled before {} was processed", file.display())]
    Cancelled { file: PathBuf },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),
}

impl ResizeError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new invalid size error
    pub fn invalid_size<T: Into<String>, R: Into<String>>(token: T, reason: R) -> Self {
        Self::InvalidSize {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Create a new task failure error
    pub fn task_failed<S: Into<String>>(message: S) -> Self {
        Self::TaskFailed {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (the batch can continue)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Detected before any concurrent work starts; abort the run
            Self::ConfigError { .. }
            | Self::InvalidSize { .. }
            | Self::NoSizes
            | Self::NoSources { .. }
            | Self::DirectoryMissing { .. }
            | Self::NotADirectory { .. }
            | Self::SerdeError(_) => false,

            // Scoped to a single load or resize task
            Self::IoError(_)
            | Self::ImageError(_)
            | Self::ZeroBoundingBox { .. }
            | Self::TaskFailed { .. }
            | Self::Cancelled { .. } => true,
        }
    }

    /// Get the associated file path if available
    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            Self::NoSources { dir: path }
            | Self::DirectoryMissing { path }
            | Self::NotADirectory { path }
            | Self::ZeroBoundingBox { file: path }
            | Self::Cancelled { file: path } => Some(path),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ResizeError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for ResizeError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}

/// Error context extension for attaching the file a failure belongs to
pub trait ErrorContext<T> {
    /// Wrap the error so its message names `file`
    fn with_file_context(self, file: &std::path::Path) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ResizeError>,
{
    fn with_file_context(self, file: &std::path::Path) -> Result<T> {
        self.map_err(|e| match e.into() {
            ResizeError::IoError(io) => ResizeError::IoError(std::io::Error::new(
                io.kind(),
                format!("{}: {}", file.display(), io),
            )),
            other => other,
        })
    }
}
