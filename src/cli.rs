//! Command-line surface of the `backdrop-dl` binary.

use crate::config::Config;
use crate::discovery::Discovery;
use crate::downloader::Downloader;
use crate::error::Result;
use crate::source::HttpPageSource;
use crate::types::{DownloadReport, Event, Quality};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// Search for and download the backgrounds shown on the Chromecast home screen.
///
/// Images can get a gradient overlay (close to how the Chromecast displays them)
/// and a watermark crediting the photographer.
#[derive(Clone, Debug, Default, Parser)]
#[command(name = "backdrop-dl", version, about, long_about = None)]
pub struct Cli {
    /// Load settings from a key=value file; other settings flags are ignored
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Directory to save images to
    #[arg(long, value_name = "PATH")]
    pub outdir: Option<PathBuf>,

    /// Apply the author's name as a watermark
    #[arg(long)]
    pub watermark: bool,

    /// Overlay a gradient (mimics the Chromecast's display of images)
    #[arg(long)]
    pub gradient: bool,

    /// Image resolution to request: high, medium or low
    #[arg(long, value_name = "LEVEL")]
    pub quality: Option<Quality>,

    /// Maximum number of images downloaded at once
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Log progress to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    fn has_setting_flags(&self) -> bool {
        self.outdir.is_some()
            || self.watermark
            || self.gradient
            || self.quality.is_some()
            || self.concurrency.is_some()
    }

    /// Resolve the run configuration.
    ///
    /// # Errors
    /// Returns a fatal configuration error if the settings file cannot be read
    /// or a value is invalid.
    pub fn into_config(self) -> Result<Config> {
        if let Some(path) = &self.settings {
            if self.has_setting_flags() {
                warn!(
                    settings = %path.display(),
                    "Settings file given; ignoring other command-line settings"
                );
            }
            return Config::from_settings_file(path);
        }

        let defaults = Config::default();
        let config = Config {
            output_dir: self.outdir.unwrap_or(defaults.output_dir),
            apply_gradient: self.gradient,
            apply_watermark: self.watermark,
            quality: self.quality.unwrap_or(defaults.quality),
            max_concurrent_downloads: self
                .concurrency
                .unwrap_or(defaults.max_concurrent_downloads),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }
}

/// Discover, download and summarise one run, printing progress to stdout
///
/// # Errors
/// Returns error if the HTTP client or the output directory cannot be set up
pub async fn execute(config: &Config) -> Result<DownloadReport> {
    println!("Chromecast Backgrounds");
    println!("\tSaving to: {}", config.output_dir.display());
    println!("\tAdding Gradient: {}", config.apply_gradient);
    println!("\tApplying Watermark: {}\n", config.apply_watermark);

    print!("Searching for backgrounds...");
    let discovery = Discovery::from_config(HttpPageSource::from_config(config)?, config);
    let working_set = discovery.discover_all().await;
    println!(" {} found.", working_set.len());

    println!("Checking for new images...");
    let downloader = Downloader::new(config)?;
    let mut events = downloader.subscribe();
    let printer = tokio::spawn(relay_dispatched(events, |line| println!("{line}")));

    let result = downloader
        .run(&working_set, &config.output_dir, &config.transform_options())
        .await;

    // Closing the channel ends the printer once it has drained
    drop(downloader);
    printer.await.ok();

    let report = result?;
    if report.nothing_new() {
        println!("No new images found.");
    }
    for failure in &report.failures {
        println!("\tFailed '{}': {} error: {}", failure.file_name, failure.stage, failure.message);
    }
    println!(
        "Finished: {} saved, {} skipped, {} failed.",
        report.succeeded,
        report.skipped,
        report.failed()
    );

    Ok(report)
}

/// Turn `Dispatched` events into progress lines until the channel closes
async fn relay_dispatched(mut events: broadcast::Receiver<Event>, mut emit: impl FnMut(String)) {
    loop {
        match events.recv().await {
            Ok(Event::Dispatched { file_name, .. }) => {
                emit(format!("\tDownloading new image '{file_name}'"));
            }
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "Progress output fell behind; some image names not shown");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
