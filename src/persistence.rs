//! Output naming and the skip-if-exists check.
//!
//! Every entry maps to exactly one file in the output directory. An entry whose
//! file already exists is considered materialized and is never fetched again.
//! Files are written under a temporary `.part` name and renamed into place, so a
//! file that exists under its final name is always complete.

use crate::error::Result;
use crate::types::Entry;
use std::path::{Path, PathBuf};

/// Extension every saved image carries
pub const IMAGE_EXTENSION: &str = "jpg";

/// Suffix of in-flight files
const PARTIAL_SUFFIX: &str = ".part";

/// Percent-encoded fragments removed from file names, in order
const STRIPPED_FRAGMENTS: [&str; 2] = ["%2B", "%2"];

/// Name used when nothing usable remains of the locator's path
const FALLBACK_STEM: &str = "image";

/// Derive the output file name for an image locator.
///
/// Takes the last path segment of the locator, drops its extension, removes the
/// `%2B` and `%2` fragments, replaces characters that are not allowed in file
/// names and appends `.jpg`. The same locator always yields the same name.
///
/// # Examples
///
/// ```
/// use backdrop_dl::persistence::canonical_name;
///
/// assert_eq!(canonical_name("http://x/a%2Bb.jpg"), "ab.jpg");
/// assert_eq!(canonical_name("https://h/p/s2560/Sunset.png?x=1"), "Sunset.jpg");
/// ```
pub fn canonical_name(source_ref: &str) -> String {
    let segment = last_path_segment(source_ref);

    let stem = match segment.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => segment.as_str(),
    };

    let mut cleaned = stem.to_string();
    for fragment in STRIPPED_FRAGMENTS {
        cleaned = cleaned.replace(fragment, "");
    }

    let mut safe: String = cleaned
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    if safe.trim_matches('.').is_empty() {
        safe = FALLBACK_STEM.to_string();
    }

    format!("{safe}.{IMAGE_EXTENSION}")
}

fn last_path_segment(source_ref: &str) -> String {
    // Raw text only: re-encoding the path would introduce new `%2x` escapes
    let end = source_ref.find(['?', '#']).unwrap_or(source_ref.len());
    let path = &source_ref[..end];
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Final path of `entry` inside `output_dir`
pub fn target_path(entry: &Entry, output_dir: &Path) -> PathBuf {
    output_dir.join(entry.canonical_name())
}

/// Whether `entry` already has a file in `output_dir`.
///
/// Read-only check; it does not reserve the name.
pub async fn is_materialized(entry: &Entry, output_dir: &Path) -> bool {
    tokio::fs::metadata(target_path(entry, output_dir))
        .await
        .is_ok_and(|meta| meta.is_file())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

/// Write `bytes` to `path` through a temporary sibling and rename it into place
pub async fn persist_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let partial = partial_path(path);

    if let Err(e) = tokio::fs::write(&partial, bytes).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }

    if let Err(e) = tokio::fs::rename(&partial, path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }

    Ok(())
}
