//! Concurrent download, transform and persist of discovered backgrounds.
//!
//! A run takes a [`WorkingSet`] and:
//! 1. creates the output directory (once, before anything is dispatched)
//! 2. skips every entry whose file already exists
//! 3. runs one unit of work per missing entry: fetch bytes, optionally apply the
//!    gradient and watermark, write the file
//! 4. waits for every unit to finish and returns a [`DownloadReport`]
//!
//! Units are isolated from each other: a failed unit is recorded in the report
//! and the others carry on. At most `max_concurrent_downloads` units are in
//! flight at a time.

mod unit;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::persistence::is_materialized;
use crate::transform::TransformOptions;
use crate::types::{DownloadReport, Event, UnitFailure, WorkingSet};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Fetches and saves the entries of a working set
#[derive(Clone)]
pub struct Downloader {
    http_client: reqwest::Client,
    concurrency: usize,
    event_tx: broadcast::Sender<Event>,
}

impl Downloader {
    /// Create a downloader with its own HTTP client
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_client(config.http_client()?, config.max_concurrent_downloads))
    }

    /// Create a downloader around an existing client
    ///
    /// A `concurrency` of zero is treated as one.
    pub fn with_client(http_client: reqwest::Client, concurrency: usize) -> Self {
        let (event_tx, _rx) = broadcast::channel(1000);
        Self {
            http_client,
            concurrency: concurrency.max(1),
            event_tx,
        }
    }

    /// Subscribe to progress events for subsequent runs
    ///
    /// Events are best-effort: a slow receiver may observe `Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Maximum number of units in flight
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Materialize every missing entry of `working_set` under `output_dir`.
    ///
    /// Returns only after every dispatched unit has finished. The report's
    /// `skipped + succeeded + failed` equals `working_set.len()`.
    ///
    /// # Errors
    /// Returns error only if the output directory cannot be created; per-entry
    /// failures are reported in the [`DownloadReport`].
    pub async fn run(
        &self,
        working_set: &WorkingSet,
        output_dir: &Path,
        options: &TransformOptions,
    ) -> Result<DownloadReport> {
        tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create output directory {}: {}",
                    output_dir.display(),
                    e
                ),
            ))
        })?;

        let mut report = DownloadReport::default();
        let mut claimed = HashSet::new();
        let mut pending = Vec::new();

        for entry in working_set {
            let file_name = entry.canonical_name();

            // Two entries may share a locator (different author credit); the
            // first one owns the file for this run.
            if is_materialized(entry, output_dir).await || !claimed.insert(file_name.clone()) {
                debug!(file = %file_name, "Image already present, skipping");
                report.skipped += 1;
                self.event_tx.send(Event::Skipped { file_name }).ok();
                continue;
            }

            self.event_tx
                .send(Event::Dispatched {
                    file_name,
                    source_ref: entry.source_ref().to_string(),
                })
                .ok();
            pending.push(entry.clone());
        }

        info!(
            total = working_set.len(),
            skipped = report.skipped,
            dispatched = pending.len(),
            concurrency = self.concurrency,
            "Starting downloads"
        );

        // Saved/Failed go out as each unit finishes; tallying waits for all of them
        let results: Vec<_> = stream::iter(pending)
            .map(|entry| {
                let http_client = self.http_client.clone();
                let event_tx = self.event_tx.clone();
                async move {
                    let result =
                        unit::process_entry(&http_client, &entry, output_dir, options).await;
                    announce(&event_tx, &result);
                    result
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for result in results {
            match result {
                Ok(_) => report.succeeded += 1,
                Err(failure) => report.failures.push(failure),
            }
        }

        info!(
            skipped = report.skipped,
            succeeded = report.succeeded,
            failed = report.failed(),
            "Downloads finished"
        );

        Ok(report)
    }
}

/// Log the outcome of one unit and broadcast it
fn announce(
    event_tx: &broadcast::Sender<Event>,
    result: &std::result::Result<PathBuf, UnitFailure>,
) {
    match result {
        Ok(saved) => {
            info!(file = %saved.display(), "Saved background");
            let file_name = saved
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            event_tx
                .send(Event::Saved {
                    file_name,
                    path: saved.clone(),
                })
                .ok();
        }
        Err(failure) => {
            warn!(
                file = %failure.file_name,
                url = %failure.entry.source_ref(),
                stage = %failure.stage,
                error = %failure.message,
                "Background download failed"
            );
            event_tx
                .send(Event::Failed {
                    file_name: failure.file_name.clone(),
                    stage: failure.stage,
                    error: failure.message.clone(),
                })
                .ok();
        }
    }
}
