//! resize-images - concurrent batch JPEG resizer
//!
//! Resizes every JPEG in a directory to a list of square bounding boxes,
//! writing one `<name>_<size>.jpg` per (source, size) pair.
//!
//! Work runs as a two-stage pipeline. The load stage decodes each source in
//! its own task and streams the results; the resize stage spawns one task per
//! (image, size) and joins them all before signalling completion. A single
//! semaphore bounds how many tasks touch files at once. Per-item failures are
//! logged and counted, never propagated: a batch always runs to the end.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use resize_images::{discover_sources, parse_sizes, prepare_destination, Config, Pipeline};
//! use std::path::Path;
//!
//! # async fn run() -> resize_images::Result<()> {
//! let config = Config::default();
//! let sizes = parse_sizes("128,512")?.non_empty()?;
//! prepare_destination("thumbs").await?;
//! let sources = discover_sources("photos").await?;
//!
//! let summary = Pipeline::new(Path::new("thumbs"), sizes, &config.processing)
//!     .run(sources)
//!     .await;
//! println!("{} variants written", summary.written);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod parallel;
pub mod processing;

// Re-export commonly used types
pub use config::{parse_sizes, Config, LoggingConfig, ProcessingConfig, SizeList, SizeTarget};
pub use error::{Result, ResizeError};
pub use parallel::{BatchSummary, Pipeline};
pub use processing::{discover_sources, prepare_destination, validate_directory, DecodedImage};

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging from configuration.
///
/// Log lines go to stderr. `RUST_LOG` overrides the configured level. Calling
/// this more than once is harmless; only the first call installs a subscriber.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .is_ok()
    };

    if installed {
        info!("resize-images v{} initialized", VERSION);
    }
}
