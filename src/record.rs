//! Record types flowing through the scrape pipeline
//!
//! A parser emits `RawRecord`s with whatever text it found on the page; the
//! data processor turns each one into a `CleanedRecord` with normalized
//! numeric fields and quality flags, and the coordinator appends the result
//! to the session `Dataset`.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// A record as extracted from a page, before any cleaning
///
/// Fields hold raw page text; `price` and `rating` may be malformed or
/// missing. Immutable once emitted by a parser.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub name: String,

    /// Raw price text, e.g. "£51.77" or "Free"
    pub price: Option<String>,

    /// Raw rating text, e.g. "Three", "4.5 out of 5", "3.0"
    pub rating: Option<String>,

    pub availability: Option<u32>,
    pub description: Option<String>,
    pub category: String,

    /// Tags attached to the item (quote-style sites); matched by the
    /// category filter alongside `category`
    pub tags: Vec<String>,

    /// Site-specific identifier such as a UPC
    pub identifier: Option<String>,

    pub url: String,
}

impl RawRecord {
    /// A record with only a name and URL, all optional fields empty.
    pub fn bare(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            price: None,
            rating: None,
            availability: None,
            description: None,
            category: String::new(),
            tags: Vec::new(),
            identifier: None,
            url: url.to_string(),
        }
    }
}

/// Per-record marker indicating a normalization or validation step could
/// not fully trust the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualityFlag {
    /// Price text could not be parsed; sentinel 0.0 assigned
    UnparseablePrice,

    /// Rating text could not be parsed; sentinel 0.0 assigned
    UnparseableRating,

    /// Rating was outside [0, 5] after scale inference and was clamped
    RatingOutOfRange,

    /// URL is not a well-formed absolute http(s) URL
    InvalidUrl,
}

/// A validated, normalized record eligible for export or analysis
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRecord {
    pub name: String,

    /// Price in canonical units, rounded to the configured decimal places
    pub price: f64,

    /// ISO currency code inferred from the raw price text; `None` when the
    /// source had no price at all
    pub currency: Option<String>,

    /// Rating on a uniform 0-5 scale
    pub rating: f64,

    pub availability: Option<u32>,
    pub description: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub identifier: Option<String>,
    pub url: String,

    /// Flags raised while normalizing this record
    pub flags: BTreeSet<QualityFlag>,
}

impl CleanedRecord {
    /// Dedup identity: exact cleaned `(name, url)` pair.
    pub fn dedup_key(&self) -> (String, String) {
        (self.name.clone(), self.url.clone())
    }
}

/// An ordered sequence of cleaned records for one scraping session
///
/// Append-only while a run is active; a new run replaces it wholesale.
/// Lives only in memory for the duration of the session.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Identifier of the site the records came from
    pub site: String,

    /// When the session started
    pub started_at: DateTime<Utc>,

    records: Vec<CleanedRecord>,
}

impl Dataset {
    /// Creates an empty dataset for a new session.
    pub fn new(site: &str) -> Self {
        Self {
            site: site.to_string(),
            started_at: Utc::now(),
            records: Vec::new(),
        }
    }

    /// Appends a record to the session.
    pub fn push(&mut self, record: CleanedRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[CleanedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Percentage of records with no quality flags (100.0 for an empty set).
    pub fn quality_score(&self) -> f64 {
        if self.records.is_empty() {
            return 100.0;
        }
        let unflagged = self.records.iter().filter(|r| r.flags.is_empty()).count();
        unflagged as f64 / self.records.len() as f64 * 100.0
    }

    /// Number of records carrying at least one quality flag.
    pub fn flagged_count(&self) -> usize {
        self.records.iter().filter(|r| !r.flags.is_empty()).count()
    }

    /// Replaces the record sequence wholesale (used by reprocessing).
    pub fn replace_records(&mut self, records: Vec<CleanedRecord>) {
        self.records = records;
    }
}
