//! Configuration management for resize-images

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::{Result, ResizeError};

pub mod sizes;
pub use sizes::*;

/// Default JPEG quality, matching the encoder's own default
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global processing settings
    pub processing: ProcessingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Global processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Worker pool size (None = one per logical CPU)
    pub threads: Option<usize>,

    /// Capacity of the decoded-image stream (None = pool size)
    pub channel_capacity: Option<usize>,

    /// JPEG output quality (1-100)
    pub quality: u8,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            threads: None,
            channel_capacity: None,
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ProcessingConfig {
    /// Number of tasks allowed to hold a file or raster at once
    pub fn pool_size(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Buffer size of the stream between the load and resize stages
    pub fn stream_capacity(&self) -> usize {
        self.channel_capacity.unwrap_or_else(|| self.pool_size()).max(1)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ResizeError::config(
                format!("Failed to read config file {:?}: {}", path.as_ref(), e)
            ))?;

        let extension = path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(ResizeError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        }
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let extension = path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let content = match extension.to_lowercase().as_str() {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| ResizeError::config(format!("TOML serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| ResizeError::config(format!("YAML serialization failed: {}", e)))?,
            _ => return Err(ResizeError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        };

        std::fs::write(&path, content)
            .map_err(|e| ResizeError::config(
                format!("Failed to write config file {:?}: {}", path.as_ref(), e)
            ))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.processing.threads == Some(0) {
            return Err(ResizeError::config("Thread count must be greater than 0"));
        }

        if self.processing.channel_capacity == Some(0) {
            return Err(ResizeError::config("Channel capacity must be greater than 0"));
        }

        if !(1..=100).contains(&self.processing.quality) {
            return Err(ResizeError::config("Quality must be between 1 and 100"));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ResizeError::config(format!("Unknown log level: {}", other))),
        }
    }
}
