//! Error types for backdrop-dl
//!
//! Two layers of failure exist in a run:
//! - [`Error`] is returned from fallible library calls. Only [`Error::Config`] is
//!   treated as fatal by the binary; everything else is recovered where it happens.
//! - [`UnitFailure`](crate::types::UnitFailure) values describe a single image that
//!   could not be fetched, transformed or saved. They are collected into the run
//!   report instead of being raised.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for backdrop-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for backdrop-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The settings key that caused the error (e.g., "ApplyGradient")
        key: Option<String>,
    },

    /// Settings file could not be read
    #[error("failed to read settings file {path}: {source}")]
    SettingsFile {
        /// Path of the settings file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote endpoint answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Requested locator
        url: String,
        /// Status code returned by the server
        status: u16,
    },

    /// Image decoding or encoding failed
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a configuration error tied to a settings key
    pub fn config(message: impl Into<String>, key: Option<&str>) -> Self {
        Self::Config {
            message: message.into(),
            key: key.map(str::to_string),
        }
    }

    /// Whether this error must abort the run before any network activity
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::SettingsFile { .. })
    }
}
