//! # backdrop-dl
//!
//! Finds the background images listed on the Chromecast home page and saves the
//! ones not yet on disk, optionally with a gradient overlay and an author
//! watermark.
//!
//! A run has two phases:
//! - **discovery**: the page is polled repeatedly and every `[url, author, ...]`
//!   tuple embedded in it is collected into a deduplicated [`WorkingSet`]
//! - **download**: each entry without a file in the output directory is fetched,
//!   transformed and written, with bounded concurrency; the run waits for every
//!   unit before reporting
//!
//! ## Quick Start
//!
//! ```no_run
//! use backdrop_dl::{Config, Discovery, Downloader, HttpPageSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         apply_gradient: true,
//!         ..Default::default()
//!     };
//!
//!     let source = HttpPageSource::from_config(&config)?;
//!     let working_set = Discovery::from_config(source, &config).discover_all().await;
//!
//!     let downloader = Downloader::new(&config)?;
//!     let report = downloader
//!         .run(&working_set, &config.output_dir, &config.transform_options())
//!         .await?;
//!
//!     println!("{} saved, {} skipped", report.succeeded, report.skipped);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Command-line surface
pub mod cli;
/// Configuration types
pub mod config;
/// Multi-poll discovery loop
pub mod discovery;
/// Concurrent download pipeline
pub mod downloader;
/// Error types
pub mod error;
/// Payload parsing
pub mod parser;
/// Output naming and skip-if-exists checks
pub mod persistence;
/// Page retrieval
pub mod source;
/// Gradient and watermark transforms
pub mod transform;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use discovery::{Discovery, EMPTY_THRESHOLD, MAX_ITERATIONS};
pub use downloader::Downloader;
pub use error::{Error, Result};
pub use parser::parse_entries;
pub use persistence::{canonical_name, is_materialized};
pub use source::{HttpPageSource, PageSource};
pub use transform::TransformOptions;
pub use types::{DownloadReport, Entry, Event, FailureStage, Quality, UnitFailure, WorkingSet};
