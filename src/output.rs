//! Run summary generation and display
//!
//! This module turns a finished run's outcome into an aggregate summary
//! and prints both the summary and the collected records to stdout.

use crate::record::{CleanedRecord, Dataset, QualityFlag};
use crate::scrape::{RunState, ScrapeOutcome};
use std::collections::{BTreeMap, HashMap};

/// Aggregate summary of one scraping run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Identifier of the scraped site
    pub site: String,

    /// Terminal state of the run
    pub state: RunState,

    /// Records kept after processing
    pub records: usize,

    /// Listing pages successfully fetched
    pub pages_fetched: u32,

    /// Duplicates discarded by the processor
    pub duplicates_removed: usize,

    /// Records dropped by the processor
    pub dropped: usize,

    /// Percentage of records without quality flags
    pub quality_score: f64,

    /// Record counts per category
    pub records_by_category: HashMap<String, usize>,

    /// Counts per quality flag across all records
    pub flag_counts: BTreeMap<QualityFlag, usize>,

    /// Mean price over all records (0.0 when empty)
    pub average_price: f64,

    /// Mean rating over all records (0.0 when empty)
    pub average_rating: f64,
}

/// Builds the aggregate summary for a finished run.
pub fn summarize(outcome: &ScrapeOutcome) -> RunSummary {
    let records = outcome.dataset.records();

    let mut records_by_category: HashMap<String, usize> = HashMap::new();
    let mut flag_counts: BTreeMap<QualityFlag, usize> = BTreeMap::new();
    let mut price_sum = 0.0;
    let mut rating_sum = 0.0;

    for record in records {
        let category = if record.category.is_empty() {
            "(uncategorized)".to_string()
        } else {
            record.category.clone()
        };
        *records_by_category.entry(category).or_insert(0) += 1;

        for flag in &record.flags {
            *flag_counts.entry(*flag).or_insert(0) += 1;
        }

        price_sum += record.price;
        rating_sum += record.rating;
    }

    let count = records.len();
    let (average_price, average_rating) = if count > 0 {
        (price_sum / count as f64, rating_sum / count as f64)
    } else {
        (0.0, 0.0)
    };

    RunSummary {
        site: outcome.dataset.site.clone(),
        state: outcome.state,
        records: count,
        pages_fetched: outcome.pages_fetched,
        duplicates_removed: outcome.duplicates_removed,
        dropped: outcome.dropped,
        quality_score: outcome.quality_score(),
        records_by_category,
        flag_counts,
        average_price,
        average_rating,
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Scrape Summary ===\n");

    println!("Overview:");
    println!("  Site: {}", summary.site);
    println!("  State: {}", summary.state);
    println!("  Records collected: {}", summary.records);
    println!("  Pages fetched: {}", summary.pages_fetched);
    println!("  Duplicates removed: {}", summary.duplicates_removed);
    println!("  Records dropped: {}", summary.dropped);
    println!();

    if !summary.records_by_category.is_empty() {
        println!("Records by Category:");
        // Sort categories by count (descending)
        let mut category_counts: Vec<_> = summary.records_by_category.iter().collect();
        category_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (category, count) in category_counts {
            println!("  {}: {}", category, count);
        }
        println!();
    }

    if !summary.flag_counts.is_empty() {
        println!("Quality Flags:");
        for (flag, count) in &summary.flag_counts {
            println!("  {:?}: {}", flag, count);
        }
        println!();
    }

    if summary.records > 0 {
        println!("Averages:");
        println!("  Price: {:.2}", summary.average_price);
        println!("  Rating: {:.2} / 5", summary.average_rating);
        println!();
    }

    println!("Quality Score: {:.1}%", summary.quality_score);
}

/// Prints up to `limit` records to stdout, one block per record.
pub fn print_records(dataset: &Dataset, limit: usize) {
    for record in dataset.records().iter().take(limit) {
        print_record(record);
    }

    let total = dataset.len();
    if total > limit {
        println!("... and {} more record(s)", total - limit);
    }
}

fn print_record(record: &CleanedRecord) {
    println!("- {}", record.name);
    match &record.currency {
        Some(code) => println!(
            "    price: {:.2} {}  rating: {:.1}",
            record.price, code, record.rating
        ),
        None => println!("    price: {:.2}  rating: {:.1}", record.price, record.rating),
    }
    println!("    category: {}", record.category);
    if !record.tags.is_empty() {
        println!("    tags: {}", record.tags.join(", "));
    }
    if let Some(identifier) = &record.identifier {
        println!("    id: {}", identifier);
    }
    println!("    url: {}", record.url);
    if !record.flags.is_empty() {
        let flags: Vec<String> = record.flags.iter().map(|f| format!("{:?}", f)).collect();
        println!("    flags: {}", flags.join(", "));
    }
}
