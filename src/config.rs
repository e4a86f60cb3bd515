//! Configuration types for backdrop-dl
//!
//! A [`Config`] is built once at startup (from defaults, command-line flags or a
//! settings file) and handed to [`Discovery`](crate::discovery::Discovery) and
//! [`Downloader`](crate::downloader::Downloader) by value. Nothing reads settings
//! from global state.

use crate::discovery::{EMPTY_THRESHOLD, MAX_ITERATIONS};
use crate::error::{Error, Result};
use crate::transform::TransformOptions;
use crate::types::Quality;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Page that lists the current backgrounds
pub const DEFAULT_SOURCE_URL: &str = "https://clients3.google.com/cast/chromecast/home/v/c9541b08";

/// Directory name used under the platform data directory
pub const APP_DIR_NAME: &str = "chromecastbg";

/// Settings file key for the gradient switch
pub const KEY_APPLY_GRADIENT: &str = "ApplyGradient";
/// Settings file key for the watermark switch
pub const KEY_APPLY_WATERMARK: &str = "ApplyWatermark";
/// Settings file key for the output directory
pub const KEY_SAVE_TO: &str = "SaveTo";

/// Main configuration for a run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Directory images are saved to (default: platform data dir + "chromecastbg")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Overlay a dark gradient, mimicking the Chromecast display (default: false)
    #[serde(default)]
    pub apply_gradient: bool,

    /// Add the author's name as a watermark (default: false)
    #[serde(default)]
    pub apply_watermark: bool,

    /// Page scanned for backgrounds
    #[serde(default = "default_source_url")]
    pub source_url: String,

    /// Resolution requested for each image (default: high)
    #[serde(default)]
    pub quality: Quality,

    /// Upper bound on page polls during discovery (default: 30)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Discovery stops once more than this many polls came back empty (default: 5)
    #[serde(default = "default_empty_threshold")]
    pub empty_threshold: usize,

    /// Maximum images fetched and processed at the same time (default: 8)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Timeout applied to every HTTP request (default: 30s)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// JPEG quality used when a transformed image is re-encoded, 1-100 (default: 90)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            apply_gradient: false,
            apply_watermark: false,
            source_url: default_source_url(),
            quality: Quality::default(),
            max_iterations: default_max_iterations(),
            empty_threshold: default_empty_threshold(),
            max_concurrent_downloads: default_max_concurrent(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Config {
    /// Load a `key=value` settings file on top of the defaults.
    ///
    /// Recognised keys are `ApplyGradient`, `ApplyWatermark` (`true`/`false`) and
    /// `SaveTo` (directory). Keys missing from the file keep their defaults;
    /// unknown keys are ignored with a warning.
    ///
    /// # Errors
    /// Returns a fatal error if the file cannot be read or a value is invalid.
    pub fn from_settings_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::SettingsFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_settings_str(&content)
    }

    /// Parse settings file content on top of the defaults
    pub fn from_settings_str(content: &str) -> Result<Self> {
        let mut config = Self::default();

        for (line_no, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let Some(split_at) = line.find(['=', ':']) else {
                return Err(Error::config(
                    format!("line {}: expected key=value, got '{line}'", line_no + 1),
                    None,
                ));
            };
            let key = line[..split_at].trim();
            let value = line[split_at + 1..].trim();

            match key {
                KEY_APPLY_GRADIENT => config.apply_gradient = parse_bool(key, value)?,
                KEY_APPLY_WATERMARK => config.apply_watermark = parse_bool(key, value)?,
                KEY_SAVE_TO => {
                    if value.is_empty() {
                        return Err(Error::config("output directory is empty", Some(key)));
                    }
                    config.output_dir = PathBuf::from(value);
                }
                other => warn!(key = other, line = line_no + 1, "Ignoring unknown setting"),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the offending field
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::config("output directory is empty", Some("output_dir")));
        }
        if self.max_iterations == 0 {
            return Err(Error::config(
                "max_iterations must be at least 1",
                Some("max_iterations"),
            ));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(Error::config(
                "max_concurrent_downloads must be at least 1",
                Some("max_concurrent_downloads"),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::config(
                format!("jpeg_quality must be 1-100, got {}", self.jpeg_quality),
                Some("jpeg_quality"),
            ));
        }
        if let Err(e) = url::Url::parse(&self.source_url) {
            return Err(Error::config(
                format!("invalid source URL '{}': {e}", self.source_url),
                Some("source_url"),
            ));
        }
        Ok(())
    }

    /// Transform switches for the download phase
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            gradient: self.apply_gradient,
            watermark: self.apply_watermark,
            jpeg_quality: self.jpeg_quality,
        }
    }

    /// Build the HTTP client shared by the page source and the downloader
    ///
    /// # Errors
    /// Returns error if the TLS backend cannot be initialised
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(Error::config(
            format!("{key} must be true or false, got '{value}'"),
            Some(key),
        ))
    }
}

/// Platform application-data location for saved images
///
/// - Windows: `%APPDATA%\chromecastbg`
/// - macOS: `~/Library/Application Support/chromecastbg`
/// - other: `$XDG_DATA_HOME/chromecastbg` or `~/.local/share/chromecastbg`
///
/// Falls back to `./chromecastbg` when no home directory can be found.
pub fn default_output_dir() -> PathBuf {
    user_data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(APP_DIR_NAME))
}

fn user_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(PathBuf::from)
    }
    #[cfg(target_os = "macos")]
    {
        home::home_dir().map(|p| p.join("Library/Application Support"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .or_else(|| home::home_dir().map(|p| p.join(".local/share")))
    }
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_max_iterations() -> usize {
    MAX_ITERATIONS
}

fn default_empty_threshold() -> usize {
    EMPTY_THRESHOLD
}

fn default_max_concurrent() -> usize {
    8
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("backdrop-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_jpeg_quality() -> u8 {
    90
}
