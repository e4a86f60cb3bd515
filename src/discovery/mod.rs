//! Multi-poll discovery of background entries.
//!
//! The page only lists a slice of the available backgrounds per request, so the
//! same URL is polled repeatedly and the results are merged into a
//! [`WorkingSet`]. Polling stops after [`MAX_ITERATIONS`] polls, or once more
//! than [`EMPTY_THRESHOLD`] polls have produced no entries at all.
//!
//! Whether repeated polls actually surface more entries depends on the remote
//! side; a page that serves identical content every time simply costs extra
//! requests. Partial discovery is a normal outcome, not an error.

use crate::config::Config;
use crate::error::Result;
use crate::parser::parse_entries;
use crate::source::PageSource;
use crate::types::{Entry, Quality, WorkingSet};
use tracing::{debug, info, warn};

/// Default upper bound on polls per discovery run
pub const MAX_ITERATIONS: usize = 30;

/// Default number of empty polls tolerated before stopping early
pub const EMPTY_THRESHOLD: usize = 5;

/// Drives repeated fetch + parse cycles against a [`PageSource`]
pub struct Discovery<S> {
    source: S,
    quality: Quality,
    max_iterations: usize,
    empty_threshold: usize,
}

impl<S: PageSource> Discovery<S> {
    /// Create a discovery loop with the default limits
    pub fn new(source: S, quality: Quality) -> Self {
        Self {
            source,
            quality,
            max_iterations: MAX_ITERATIONS,
            empty_threshold: EMPTY_THRESHOLD,
        }
    }

    /// Create a discovery loop using the quality and limits from `config`
    pub fn from_config(source: S, config: &Config) -> Self {
        Self::new(source, config.quality).with_limits(config.max_iterations, config.empty_threshold)
    }

    /// Override the poll cap and the empty-poll threshold
    pub fn with_limits(mut self, max_iterations: usize, empty_threshold: usize) -> Self {
        self.max_iterations = max_iterations;
        self.empty_threshold = empty_threshold;
        self
    }

    /// Borrow the underlying source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch the page once and parse it
    ///
    /// # Errors
    /// Returns error if the page cannot be fetched
    pub async fn discover_once(&self) -> Result<Vec<Entry>> {
        let page = self.source.fetch_page().await?;
        Ok(parse_entries(&page, self.quality))
    }

    /// Poll until a stopping condition is hit and return everything seen.
    ///
    /// A failed fetch counts as an empty poll. The empty-poll counter only ever
    /// grows: a poll that yields entries (new or not) leaves it unchanged.
    pub async fn discover_all(&self) -> WorkingSet {
        let mut working_set = WorkingSet::new();
        let mut iterations = 0;
        let mut empty_streak = 0;

        while iterations < self.max_iterations && empty_streak <= self.empty_threshold {
            let batch = match self.discover_once().await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(poll = iterations + 1, error = %e, "Background page fetch failed");
                    Vec::new()
                }
            };

            if batch.is_empty() {
                empty_streak += 1;
                debug!(poll = iterations + 1, empty_streak, "Poll returned no entries");
            } else {
                let found = batch.len();
                let added = working_set.merge(batch);
                debug!(
                    poll = iterations + 1,
                    found,
                    added,
                    total = working_set.len(),
                    "Merged poll results"
                );
            }

            iterations += 1;
        }

        info!(
            polls = iterations,
            empty_polls = empty_streak,
            entries = working_set.len(),
            "Discovery finished"
        );

        working_set
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
