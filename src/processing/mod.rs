//! Data processing pipeline
//!
//! Raw records pass through a fixed sequence of steps: text cleaning, price
//! normalization, rating normalization, URL validation, duplicate removal
//! and quality scoring. Validation problems degrade to quality flags and
//! never abort a run; only records without a usable identity (empty name)
//! are dropped outright, plus any flagged record when strict mode is on.
//!
//! The pipeline is idempotent: [`Processor::reprocess`] over an existing
//! dataset re-cleans text but leaves canonical numerics and existing flags
//! untouched, producing an identical dataset.

mod numeric;
mod text;

pub use numeric::{currency_code, parse_price, parse_rating, round_to};
pub use text::{clean_optional, clean_text};

use crate::config::ProcessingConfig;
use crate::record::{CleanedRecord, Dataset, QualityFlag, RawRecord};
use std::collections::{BTreeSet, HashSet};
use url::Url;

/// Why a record was removed from the stream instead of being kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Name was empty after cleaning; the record has no identity
    EmptyName,

    /// Strict mode is on and the record carries quality flags
    Strict,
}

/// Result of pushing one raw record through the pipeline
#[derive(Debug)]
pub enum Processed {
    Kept(CleanedRecord),
    Dropped(DropReason),
}

/// Counters produced by a batch run of the pipeline
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessStats {
    /// Later records whose cleaned `(name, url)` matched an earlier one
    pub duplicates_removed: usize,

    /// Records dropped for having no usable identity or by strict mode
    pub dropped: usize,
}

/// Tracks cleaned `(name, url)` identities seen so far; first occurrence
/// wins, later ones are counted and discarded
#[derive(Debug, Default)]
pub struct Deduper {
    seen: HashSet<(String, String)>,
    duplicates: usize,
}

impl Deduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the record is the first with its identity.
    pub fn insert(&mut self, record: &CleanedRecord) -> bool {
        if self.seen.insert(record.dedup_key()) {
            true
        } else {
            self.duplicates += 1;
            false
        }
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

/// The data processor, configured once per session
#[derive(Debug, Clone)]
pub struct Processor {
    config: ProcessingConfig,
}

impl Processor {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Runs one raw record through steps 1-4 of the pipeline (cleaning,
    /// price, rating, URL). Deduplication happens against a [`Deduper`]
    /// owned by the caller, since it spans the whole stream.
    pub fn process_record(&self, raw: &RawRecord) -> Processed {
        let mut flags = BTreeSet::new();

        // 1. Text cleaning
        let name = clean_text(&raw.name);
        if name.is_empty() {
            return Processed::Dropped(DropReason::EmptyName);
        }
        let description = clean_optional(raw.description.as_deref());
        let category = clean_text(&raw.category);
        let tags: Vec<String> = raw
            .tags
            .iter()
            .map(|t| clean_text(t))
            .filter(|t| !t.is_empty())
            .collect();

        // 2. Price normalization
        let currency = raw
            .price
            .as_deref()
            .map(|text| currency_code(text).to_string());
        let price = match raw.price.as_deref().and_then(parse_price) {
            Some(value) => round_to(value, self.config.decimal_places),
            None => {
                flags.insert(QualityFlag::UnparseablePrice);
                0.0
            }
        };

        // 3. Rating normalization
        let rating = match raw.rating.as_deref().and_then(parse_rating) {
            Some(value) => {
                let clamped = value.clamp(0.0, 5.0);
                if clamped != value {
                    flags.insert(QualityFlag::RatingOutOfRange);
                }
                round_to(clamped, 2)
            }
            None => {
                flags.insert(QualityFlag::UnparseableRating);
                0.0
            }
        };

        // 4. URL validation
        let url = raw.url.trim().to_string();
        if !is_valid_url(&url) {
            flags.insert(QualityFlag::InvalidUrl);
        }

        if self.config.strict && !flags.is_empty() {
            return Processed::Dropped(DropReason::Strict);
        }

        Processed::Kept(CleanedRecord {
            name,
            price,
            currency,
            rating,
            availability: raw.availability,
            description,
            category,
            tags,
            identifier: raw
                .identifier
                .as_deref()
                .map(clean_text)
                .filter(|s| !s.is_empty()),
            url,
            flags,
        })
    }

    /// Runs the full pipeline over a batch of raw records.
    pub fn process_batch(&self, site: &str, raws: &[RawRecord]) -> (Dataset, ProcessStats) {
        let mut dataset = Dataset::new(site);
        let mut deduper = Deduper::new();
        let mut stats = ProcessStats::default();

        for raw in raws {
            match self.process_record(raw) {
                Processed::Kept(record) => {
                    if deduper.insert(&record) {
                        dataset.push(record);
                    }
                }
                Processed::Dropped(_) => stats.dropped += 1,
            }
        }

        stats.duplicates_removed = deduper.duplicates();
        (dataset, stats)
    }

    /// Re-runs the pipeline over an already-cleaned dataset.
    ///
    /// Text fields are re-cleaned (a no-op on clean input), numeric fields
    /// are left at their canonical values to avoid double-rounding drift,
    /// existing flags are preserved without re-flagging, and deduplication
    /// runs again (removing nothing from a deduplicated set).
    pub fn reprocess(&self, dataset: &Dataset) -> Dataset {
        let mut deduper = Deduper::new();
        let mut out = dataset.clone();

        let records = dataset
            .records()
            .iter()
            .map(|record| {
                let mut cleaned = record.clone();
                cleaned.name = clean_text(&record.name);
                cleaned.description = clean_optional(record.description.as_deref());
                cleaned.category = clean_text(&record.category);
                cleaned.tags = record
                    .tags
                    .iter()
                    .map(|t| clean_text(t))
                    .filter(|t| !t.is_empty())
                    .collect();
                cleaned
            })
            .filter(|record| deduper.insert(record))
            .collect();

        out.replace_records(records);
        out
    }
}

/// A URL is valid when it is absolute, uses http or https, and has a host.
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            (parsed.scheme() == "http" || parsed.scheme() == "https")
                && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> Processor {
        Processor::new(ProcessingConfig::default())
    }

    fn raw(name: &str, price: &str, rating: &str, url: &str) -> RawRecord {
        RawRecord {
            name: name.to_string(),
            price: Some(price.to_string()),
            rating: Some(rating.to_string()),
            availability: Some(3),
            description: Some("  a   description ".to_string()),
            category: " Science  Fiction ".to_string(),
            tags: vec![],
            identifier: None,
            url: url.to_string(),
        }
    }

    fn kept(processed: Processed) -> CleanedRecord {
        match processed {
            Processed::Kept(record) => record,
            Processed::Dropped(reason) => panic!("record was dropped: {:?}", reason),
        }
    }

    #[test]
    fn test_happy_path_normalization() {
        let record = kept(processor().process_record(&raw(
            " The  Martian ",
            "$12.99",
            "Three",
            "http://example.com/martian",
        )));

        assert_eq!(record.name, "The Martian");
        assert_eq!(record.price, 12.99);
        assert_eq!(record.rating, 3.0);
        assert_eq!(record.category, "Science Fiction");
        assert_eq!(record.description.as_deref(), Some("a description"));
        assert!(record.flags.is_empty());
    }

    #[test]
    fn test_unparseable_price_gets_sentinel_and_flag() {
        let record = kept(processor().process_record(&raw(
            "Freebie",
            "Free",
            "3.0",
            "http://example.com/x",
        )));

        assert_eq!(record.price, 0.0);
        assert!(record.flags.contains(&QualityFlag::UnparseablePrice));
    }

    #[test]
    fn test_missing_price_gets_sentinel_and_flag() {
        let mut item = raw("X", "1.0", "3.0", "http://example.com/x");
        item.price = None;
        let record = kept(processor().process_record(&item));

        assert_eq!(record.price, 0.0);
        assert!(record.flags.contains(&QualityFlag::UnparseablePrice));
    }

    #[test]
    fn test_out_of_range_rating_clamped_and_flagged() {
        // 300 is treated as a 100-point scale (15.0), still out of range
        let record = kept(processor().process_record(&raw(
            "X",
            "1.0",
            "300",
            "http://example.com/x",
        )));

        assert_eq!(record.rating, 5.0);
        assert!(record.flags.contains(&QualityFlag::RatingOutOfRange));
    }

    #[test]
    fn test_ten_point_rating_rescaled_without_flag() {
        let record = kept(processor().process_record(&raw(
            "X",
            "1.0",
            "7",
            "http://example.com/x",
        )));

        assert_eq!(record.rating, 3.5);
        assert!(record.flags.is_empty());
    }

    #[test]
    fn test_invalid_url_flags_record() {
        let record = kept(processor().process_record(&raw("X", "1.0", "3", "not a url")));
        assert!(record.flags.contains(&QualityFlag::InvalidUrl));
    }

    #[test]
    fn test_empty_name_is_dropped() {
        let result = processor().process_record(&raw("   ", "1.0", "3", "http://example.com/x"));
        assert!(matches!(
            result,
            Processed::Dropped(DropReason::EmptyName)
        ));
    }

    #[test]
    fn test_strict_mode_drops_flagged_records() {
        let strict = Processor::new(ProcessingConfig {
            decimal_places: 2,
            strict: true,
        });

        let result = strict.process_record(&raw("X", "Free", "3", "http://example.com/x"));
        assert!(matches!(result, Processed::Dropped(DropReason::Strict)));

        // Unflagged records still pass
        let result = strict.process_record(&raw("X", "1.0", "3", "http://example.com/x"));
        assert!(matches!(result, Processed::Kept(_)));
    }

    #[test]
    fn test_batch_deduplicates_first_wins() {
        let records = vec![
            raw("Same", "1.00", "3", "http://example.com/same"),
            raw("Other", "2.00", "4", "http://example.com/other"),
            // Same identity as the first after cleaning
            raw("  Same ", "9.99", "5", "http://example.com/same"),
        ];

        let (dataset, stats) = processor().process_batch("books", &records);

        assert_eq!(dataset.len(), 2);
        assert_eq!(stats.duplicates_removed, 1);
        // First occurrence survives with its own price
        assert_eq!(dataset.records()[0].price, 1.0);
    }

    #[test]
    fn test_pipeline_is_idempotent() {
        let records = vec![
            raw("A", "$12.99", "Three", "http://example.com/a"),
            raw("B", "Free", "nonsense", "http://example.com/b"),
            raw("C", "1,299.00", "85", "bad url"),
        ];

        let p = processor();
        let (once, _) = p.process_batch("books", &records);
        let twice = p.reprocess(&once);

        assert_eq!(once.records(), twice.records());
    }

    #[test]
    fn test_reprocess_preserves_flags() {
        let (once, _) = processor().process_batch(
            "books",
            &[raw("B", "Free", "3", "http://example.com/b")],
        );
        let twice = processor().reprocess(&once);

        assert!(twice.records()[0]
            .flags
            .contains(&QualityFlag::UnparseablePrice));
    }

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("http://example.com/page"));
        assert!(is_valid_url("https://example.com"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("/relative/path"));
        assert!(!is_valid_url("not a url"));
    }
}
