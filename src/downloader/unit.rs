//! A single unit of work: fetch one image, transform it, write it.

use crate::persistence::{persist_atomic, target_path};
use crate::transform::{self, TransformOptions};
use crate::types::{Entry, FailureStage, UnitFailure};
use image::ImageFormat;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::debug;

fn failure(entry: &Entry, stage: FailureStage, error: impl Display) -> UnitFailure {
    UnitFailure {
        entry: entry.clone(),
        file_name: entry.canonical_name(),
        stage,
        message: error.to_string(),
    }
}

/// Fetch the raw bytes behind `entry`
async fn fetch_bytes(
    http_client: &reqwest::Client,
    entry: &Entry,
) -> std::result::Result<Vec<u8>, UnitFailure> {
    let response = http_client
        .get(entry.source_ref())
        .send()
        .await
        .map_err(|e| failure(entry, FailureStage::Fetch, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(failure(
            entry,
            FailureStage::Fetch,
            format!("HTTP {}", status.as_u16()),
        ));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| failure(entry, FailureStage::Fetch, e))?;

    Ok(bytes.to_vec())
}

/// Turn fetched bytes into what gets written to disk.
///
/// A JPEG payload with no transforms enabled is kept byte-for-byte. Anything
/// else is decoded, edited and re-encoded as JPEG on the blocking pool, so the
/// saved file always matches its `.jpg` name.
async fn render(
    entry: &Entry,
    bytes: Vec<u8>,
    options: &TransformOptions,
) -> std::result::Result<Vec<u8>, UnitFailure> {
    let format =
        transform::sniff_format(&bytes).map_err(|e| failure(entry, FailureStage::Decode, e))?;
    if !options.any() && format == ImageFormat::Jpeg {
        return Ok(bytes);
    }

    let author = entry.author().to_string();
    let options = *options;

    let outcome = tokio::task::spawn_blocking(move || {
        let mut image =
            transform::decode(&bytes).map_err(|e| (FailureStage::Decode, e.to_string()))?;
        transform::apply(&mut image, &author, &options);
        transform::encode_jpeg(&image, options.jpeg_quality)
            .map_err(|e| (FailureStage::Transform, e.to_string()))
    })
    .await
    .map_err(|e| failure(entry, FailureStage::Join, e))?;

    outcome.map_err(|(stage, message)| failure(entry, stage, message))
}

/// Run the whole unit for `entry`, returning the saved path
pub(super) async fn process_entry(
    http_client: &reqwest::Client,
    entry: &Entry,
    output_dir: &Path,
    options: &TransformOptions,
) -> std::result::Result<PathBuf, UnitFailure> {
    let path = target_path(entry, output_dir);
    debug!(url = %entry.source_ref(), file = %path.display(), "Downloading background");

    let bytes = fetch_bytes(http_client, entry).await?;
    let output = render(entry, bytes, options).await?;

    persist_atomic(&path, &output)
        .await
        .map_err(|e| failure(entry, FailureStage::Persist, e))?;

    Ok(path)
}
