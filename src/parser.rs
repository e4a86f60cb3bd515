//! Extraction of background entries from the raw home-page payload.
//!
//! The page embeds its image list inside a script block as bracketed tuples with
//! `\x22`-escaped quotes, e.g.
//!
//! ```text
//! [\x22https://lh3.example.com/abc/s1280-w1280-c-h720/pic.jpg\x22,\x22Jane Doe\x22,...]
//! ```
//!
//! Parsing is a pure function of the input text; duplicates inside one payload are
//! kept and left to [`WorkingSet`](crate::types::WorkingSet).

use crate::types::{Entry, Quality};
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

/// Size token used by the page for its default (low-resolution) variants
pub const LOW_RES_TOKEN: &str = "s1280-w1280-c-h720";

/// Escape sequence the page uses for `"`
const ESCAPED_QUOTE: &str = "\\x22";

/// Bracketed group whose first field starts with an HTTP locator
#[allow(clippy::expect_used)]
static TUPLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(http.*?)\]").expect("tuple pattern is valid"));

/// Strip escape artifacts so embedded tuples become plain comma-separated text.
///
/// Line breaks are dropped as well, so a tuple wrapped across lines reads as one.
pub fn normalize_payload(raw: &str) -> String {
    raw.replace(ESCAPED_QUOTE, "")
        .replace(['\\', '\r', '\n'], "")
}

/// Parse every entry in `raw`, in scan order.
///
/// Field 0 of a tuple is the locator (with [`LOW_RES_TOKEN`] replaced by the
/// token of `quality`), field 1 is the author. Tuples with fewer than two fields
/// are skipped.
pub fn parse_entries(raw: &str, quality: Quality) -> Vec<Entry> {
    let text = normalize_payload(raw);

    TUPLE_PATTERN
        .captures_iter(&text)
        .filter_map(|caps| {
            let body = caps.get(1)?.as_str();
            let mut fields = body.split(',');
            let href = fields.next()?;
            let Some(author) = fields.next() else {
                trace!(tuple = body, "Skipping tuple without author field");
                return None;
            };
            let source_ref = href.trim().replace(LOW_RES_TOKEN, quality.token());
            Some(Entry::new(source_ref, author.trim()))
        })
        .collect()
}
