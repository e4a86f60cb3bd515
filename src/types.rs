//! Core types for backdrop-dl

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::persistence::canonical_name;

/// One discovered background image
///
/// Entries are plain values: two entries are equal when both the locator and the
/// author match. They are never mutated after parsing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    source_ref: String,
    author: String,
}

impl Entry {
    /// Create a new entry from an image locator and its author
    pub fn new(source_ref: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            author: author.into(),
        }
    }

    /// Image locator
    pub fn source_ref(&self) -> &str {
        &self.source_ref
    }

    /// Free-text author credit
    pub fn author(&self) -> &str {
        &self.author
    }

    /// File name the image is saved under (see [`canonical_name`])
    pub fn canonical_name(&self) -> String {
        canonical_name(&self.source_ref)
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.source_ref, self.author)
    }
}

/// Requested image resolution
///
/// The remote page links low-resolution variants; the size token in the locator is
/// swapped for the token of the selected quality. The server may not honour the
/// exact pixel size, but these are the tokens it accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// 2560px variant
    #[default]
    High,
    /// 1920px variant
    Medium,
    /// 720px variant
    Low,
}

impl Quality {
    /// Size token substituted into image locators
    pub fn token(&self) -> &'static str {
        match self {
            Quality::High => "s2560",
            Quality::Medium => "s1920",
            Quality::Low => "s720",
        }
    }
}

impl std::str::FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Quality::High),
            "medium" => Ok(Quality::Medium),
            "low" => Ok(Quality::Low),
            other => Err(format!(
                "unknown quality '{other}' (expected high, medium or low)"
            )),
        }
    }
}

/// Deduplicated, insertion-ordered collection of entries accumulated across polls
#[derive(Clone, Debug, Default)]
pub struct WorkingSet {
    entries: Vec<Entry>,
    seen: HashSet<Entry>,
}

impl WorkingSet {
    /// Create an empty working set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry` unless an equal entry is already present.
    ///
    /// Returns `true` if the entry was new.
    pub fn insert(&mut self, entry: Entry) -> bool {
        if self.seen.contains(&entry) {
            return false;
        }
        self.seen.insert(entry.clone());
        self.entries.push(entry);
        true
    }

    /// Merge a batch in order, returning how many entries were new
    pub fn merge<I>(&mut self, batch: I) -> usize
    where
        I: IntoIterator<Item = Entry>,
    {
        let mut added = 0;
        for entry in batch {
            if self.insert(entry) {
                added += 1;
            }
        }
        added
    }

    /// Whether an equal entry is present
    pub fn contains(&self, entry: &Entry) -> bool {
        self.seen.contains(entry)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-discovery order
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Entries in first-discovery order
    pub fn as_slice(&self) -> &[Entry] {
        &self.entries
    }

    /// Consume the set, keeping discovery order
    pub fn into_vec(self) -> Vec<Entry> {
        self.entries
    }
}

impl FromIterator<Entry> for WorkingSet {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        let mut set = WorkingSet::new();
        set.merge(iter);
        set
    }
}

impl IntoIterator for WorkingSet {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a WorkingSet {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Step of a unit of work that failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    /// Fetching the image bytes
    Fetch,
    /// Decoding the payload as an image
    Decode,
    /// Applying gradient or watermark, or re-encoding
    Transform,
    /// Writing the file to the output directory
    Persist,
    /// The worker task itself died (panic or cancellation)
    Join,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureStage::Fetch => "fetch",
            FailureStage::Decode => "decode",
            FailureStage::Transform => "transform",
            FailureStage::Persist => "persist",
            FailureStage::Join => "join",
        };
        f.write_str(s)
    }
}

/// A single entry that could not be materialized
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnitFailure {
    /// The entry that failed
    pub entry: Entry,
    /// Target file name
    pub file_name: String,
    /// Where in the unit it failed
    pub stage: FailureStage,
    /// Human-readable cause
    pub message: String,
}

impl std::fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} failed): {}",
            self.file_name, self.stage, self.message
        )
    }
}

/// Outcome of one download run
///
/// `skipped + succeeded + failed()` always equals the size of the working set
/// that was passed in.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DownloadReport {
    /// Entries already present in the output directory
    pub skipped: usize,
    /// Entries fetched and saved during this run
    pub succeeded: usize,
    /// Entries that were dispatched but could not be saved
    pub failures: Vec<UnitFailure>,
}

impl DownloadReport {
    /// Number of failed units
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Number of units that were dispatched
    pub fn dispatched(&self) -> usize {
        self.succeeded + self.failed()
    }

    /// Number of entries accounted for
    pub fn total(&self) -> usize {
        self.skipped + self.dispatched()
    }

    /// True when every entry was already materialized
    pub fn nothing_new(&self) -> bool {
        self.dispatched() == 0
    }
}

/// Event emitted while a download run progresses
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Entry already on disk, nothing to do
    Skipped {
        /// Target file name
        file_name: String,
    },

    /// A unit of work was started for a missing entry
    Dispatched {
        /// Target file name
        file_name: String,
        /// Image locator being fetched
        source_ref: String,
    },

    /// Image saved
    Saved {
        /// Target file name
        file_name: String,
        /// Final path on disk
        path: PathBuf,
    },

    /// Unit of work failed
    Failed {
        /// Target file name
        file_name: String,
        /// Where it failed
        stage: FailureStage,
        /// Error description
        error: String,
    },
}
