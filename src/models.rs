//! Data models for extracted content and composed publish records.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Extraction`]: Raw text/image/title pulled out of a target page
//! - [`ContentRecord`]: The composed record delivered to the content store
//! - [`Platform`]: The fixed set of target publishing platforms
//! - [`ContentHash`]: The deduplication key over (source URL, extracted text)
//!
//! [`ContentRecord`] serializes with camelCase field names to match the JSON
//! shape the content-store API expects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Maximum length of a composed record's title, in characters.
pub const TITLE_MAX_CHARS: usize = 250;

/// Content successfully extracted from one target page.
///
/// This is the output of the extraction orchestrator, before composition.
/// Image and title are optional: their absence is never a failure, only the
/// body text is required.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Readable article text (paragraphs and headings, blank-line separated).
    pub text: String,
    /// Illustrative image URL, if the page advertised one.
    pub image_url: Option<String>,
    /// Page title, if present and non-empty.
    pub title: Option<String>,
}

/// The fixed enumeration of target publishing platforms.
///
/// Assigned round-robin by the composer so the long-run distribution across
/// platforms is even.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    WordPress,
    Blogspot,
    Tumblr,
    X,
}

impl Platform {
    /// All platforms, in rotation order.
    pub const ALL: [Platform; 4] = [
        Platform::WordPress,
        Platform::Blogspot,
        Platform::Tumblr,
        Platform::X,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::WordPress => "WordPress",
            Platform::Blogspot => "Blogspot",
            Platform::Tumblr => "Tumblr",
            Platform::X => "X",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A composed content record, ready for delivery to the content store.
///
/// Created by the composer, consumed by the publisher, never read back.
///
/// # Invariants
///
/// - `title` is at most [`TITLE_MAX_CHARS`] characters
/// - `scheduled_at` lies in `[created_at + 5min, created_at + 60min]`
/// - `status` is always `"scheduled"`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    /// Post title, truncated to the platform limit.
    pub title: String,
    /// Body text with the promotional fragment appended.
    pub description: String,
    /// Illustrative image URL; empty string when the page had none.
    pub image_url: String,
    /// The page the content was extracted from.
    pub source_url: String,
    /// Platform the post is destined for.
    pub target_platform: Platform,
    /// Randomized future publish time.
    pub scheduled_at: DateTime<Utc>,
    /// Fixed to `"scheduled"` at composition.
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Deduplication key: SHA-256 over the source URL and the extracted text.
///
/// Two extractions of the same URL with byte-identical text always produce
/// the same hash, so a page only ever yields one delivered record until its
/// content changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Compute the hash over the canonical `url + "\n" + text` representation.
    pub fn compute(source_url: &str, text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source_url.as_bytes());
        hasher.update(b"\n");
        hasher.update(text.as_bytes());
        ContentHash(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
