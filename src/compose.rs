//! Post composition: extracted content in, publishable record out.
//!
//! The composer owns the bits of per-process state the record depends on:
//! the promotional fragment list and the platform rotation counter. It is
//! held by the cycle controller and passed by reference, never global, so
//! two controllers in tests rotate independently.
//!
//! Platform assignment is round-robin over the fixed enumeration rather
//! than random: the long-run distribution is even and tests can assert the
//! exact sequence.

use crate::models::{ContentRecord, Extraction, Platform, TITLE_MAX_CHARS};
use chrono::{Duration, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

/// Randomized schedule offset bounds, in seconds.
const SCHEDULE_MIN_SECS: i64 = 5 * 60;
const SCHEDULE_MAX_SECS: i64 = 60 * 60;

/// Builds [`ContentRecord`]s from extractions.
pub struct PostComposer {
    promos: Vec<String>,
    rotation: usize,
}

impl PostComposer {
    /// # Arguments
    ///
    /// * `promos` - Promotional fragments; may be empty, in which case no
    ///   fragment is appended
    pub fn new(promos: Vec<String>) -> Self {
        Self { promos, rotation: 0 }
    }

    /// Compose a record from one successful extraction.
    ///
    /// The description is the extracted text plus a blank line and one promo
    /// fragment chosen at random. The title falls back to the first line of
    /// the text when the page had none; either way it is truncated to the
    /// 250-character limit. The schedule time lands uniformly between 5 and
    /// 60 minutes from now.
    pub fn compose(&mut self, extraction: &Extraction, source_url: &str) -> ContentRecord {
        let now = Utc::now();
        let offset_secs = rand::rng().random_range(SCHEDULE_MIN_SECS..=SCHEDULE_MAX_SECS);

        let platform = Platform::ALL[self.rotation % Platform::ALL.len()];
        self.rotation = self.rotation.wrapping_add(1);

        let title_source = extraction
            .title
            .as_deref()
            .unwrap_or_else(|| first_line(&extraction.text));

        let record = ContentRecord {
            title: truncate_chars(title_source, TITLE_MAX_CHARS),
            description: self.description_for(&extraction.text),
            image_url: extraction.image_url.clone().unwrap_or_default(),
            source_url: source_url.to_string(),
            target_platform: platform,
            scheduled_at: now + Duration::seconds(offset_secs),
            status: "scheduled".to_string(),
            created_at: now,
            updated_at: now,
        };
        debug!(
            platform = %record.target_platform,
            scheduled_at = %record.scheduled_at,
            title_chars = record.title.chars().count(),
            "Composed content record"
        );
        record
    }

    fn description_for(&self, text: &str) -> String {
        match self.promos.choose(&mut rand::rng()) {
            Some(promo) => format!("{text}\n\n{promo}"),
            None => text.to_string(),
        }
    }
}

/// First non-empty prefix line of the text, trimmed.
fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
