//! Utility functions for HTML stripping, word counting, and file system
//! operations.
//!
//! This module provides helper functions used throughout the importer:
//! - HTML tag stripping for headline and body fields
//! - Word counting for the page-level word count metric
//! - String truncation for logging
//! - File system validation for output directories

use once_cell::sync::Lazy;
use scraper::Html;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Strip HTML tags from a string, keeping only the text content.
///
/// Editors enter headlines and body copy with inline markup (`<em>`,
/// `<a>`, etc.); the analytics store wants plain text.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(strip_tags("An <em>emphatic</em> headline"), "An emphatic headline");
/// ```
pub fn strip_tags(s: &str) -> String {
    if !s.contains('<') {
        return s.to_string();
    }
    let fragment = Html::parse_fragment(s);
    fragment.root_element().text().collect::<String>()
}

/// Count whitespace-separated words in a string.
pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", &s[..max], s.len() - max)
    }
}

/// Capitalize the first character of a string.
///
/// Used to normalize legacy `contentChannel` values (e.g. "other" -> "Other").
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Anchor selector shared by the transforms that mine links out of body
/// copy.
pub static ANCHOR_SELECTOR: Lazy<scraper::Selector> =
    Lazy::new(|| scraper::Selector::parse("a[href]").unwrap());
