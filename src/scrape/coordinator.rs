//! Scrape coordinator - main run orchestration logic
//!
//! This module contains the per-run loop that walks a site's listing pages:
//! fetching each page through the rate-limited client, parsing it with the
//! site's parser, filtering and optionally enriching items from their detail
//! pages, and finally pushing everything through the data processor. The
//! loop observes the cancellation flag at each page boundary and publishes
//! progress events as items accumulate.

use crate::config::{ScrapeConfig, ScrapingConfig, SiteConfig};
use crate::processing::Processor;
use crate::record::{Dataset, RawRecord};
use crate::scrape::events::{EventSender, ProgressUpdate, RunState, ScrapeEvent};
use crate::scrape::fetcher::{ErrorCounter, FetchClient};
use crate::scrape::CancelFlag;
use crate::sites::SiteParser;
use crate::{ConfigError, PricewrenError};
use url::Url;

/// Final result of a scraping run, terminal state plus the processed dataset
#[derive(Debug)]
pub struct ScrapeOutcome {
    /// Terminal state: Completed, Stopped or Failed
    pub state: RunState,

    /// Cleaned, deduplicated records; partial on Stopped and Failed
    pub dataset: Dataset,

    /// Duplicate records discarded by the processor
    pub duplicates_removed: usize,

    /// Records dropped by the processor (empty name, or strict mode)
    pub dropped: usize,

    /// Listing pages successfully fetched and parsed
    pub pages_fetched: u32,

    /// The fatal error, when `state` is Failed
    pub error: Option<PricewrenError>,
}

impl ScrapeOutcome {
    /// Percentage of records without quality flags (100.0 when empty).
    pub fn quality_score(&self) -> f64 {
        self.dataset.quality_score()
    }
}

/// How a failed page or item affects the rest of the run
enum FailurePolicy {
    /// Keep what we have and end pagination normally
    StopPagination,

    /// Abort the run with this error
    Fatal(PricewrenError),
}

/// Per-run coordinator owning the fetch client, parser and processor
pub struct Coordinator {
    site: SiteConfig,
    run: ScrapeConfig,
    scraping: ScrapingConfig,
    fetcher: FetchClient,
    parser: Box<dyn SiteParser>,
    processor: Processor,
    errors: ErrorCounter,
    cancel: CancelFlag,
    events: EventSender,
}

impl Coordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        site: SiteConfig,
        run: ScrapeConfig,
        scraping: ScrapingConfig,
        fetcher: FetchClient,
        parser: Box<dyn SiteParser>,
        processor: Processor,
        errors: ErrorCounter,
        cancel: CancelFlag,
        events: EventSender,
    ) -> Self {
        Self {
            site,
            run,
            scraping,
            fetcher,
            parser,
            processor,
            errors,
            cancel,
            events,
        }
    }

    /// Runs the scrape to completion and returns the outcome.
    ///
    /// The loop walks listing pages from the site's base URL until the
    /// record cap is reached, the page cap is reached, the site reports no
    /// next page, cancellation is requested, or a fatal error occurs. All
    /// collected raw records then pass through the data processor, so even
    /// Stopped and Failed outcomes carry a cleaned dataset.
    pub async fn run(mut self) -> ScrapeOutcome {
        tracing::info!(
            "Starting scrape of {} (max {} records, {} pages)",
            self.site.id,
            self.run.max_products,
            self.site.max_pages
        );

        let start_url = match Url::parse(&self.site.base_url) {
            Ok(url) => url,
            Err(e) => {
                // Validation checks this at load time; a failure here means
                // the config was constructed by hand.
                let error = PricewrenError::Config(ConfigError::InvalidUrl(format!(
                    "{}: {}",
                    self.site.base_url, e
                )));
                return self.finish(RunState::Failed, Vec::new(), 0, Some(error));
            }
        };

        let max_items = self.run.max_products as usize;
        let mut raws: Vec<RawRecord> = Vec::new();
        let mut pages_fetched = 0u32;
        let mut next = Some(start_url);
        let mut state = RunState::Completed;
        let mut error = None;

        'pages: while let Some(page_url) = next.take() {
            if self.cancel.is_cancelled() {
                tracing::info!("Cancellation requested, stopping after {} items", raws.len());
                state = RunState::Stopped;
                break;
            }
            if pages_fetched >= self.site.max_pages || raws.len() >= max_items {
                break;
            }

            self.progress(
                raws.len(),
                &format!("Fetching page {}", pages_fetched + 1),
            );

            let page = match self.fetcher.fetch(&page_url).await {
                Ok(page) => page,
                Err(e) => {
                    // A lost listing page means the next-page link is lost
                    // too, so pagination cannot continue either way.
                    match self.page_failure(e.into()) {
                        FailurePolicy::StopPagination => {}
                        FailurePolicy::Fatal(e) => {
                            state = RunState::Failed;
                            error = Some(e);
                        }
                    }
                    break;
                }
            };

            let listing = match self.parser.parse_listing(&page.body, &page.url) {
                Ok(listing) => listing,
                Err(e) => {
                    self.errors.record_failure();
                    match self.page_failure(e.into()) {
                        FailurePolicy::StopPagination => {}
                        FailurePolicy::Fatal(e) => {
                            state = RunState::Failed;
                            error = Some(e);
                        }
                    }
                    break;
                }
            };

            pages_fetched += 1;
            tracing::debug!(
                "Page {} yielded {} items (next: {})",
                pages_fetched,
                listing.items.len(),
                listing.has_next_page()
            );

            let enrich = self.site.detail_pages && self.parser.supports_details();
            for item in listing.items {
                if raws.len() >= max_items {
                    break;
                }
                if !self.matches_filter(&item) {
                    continue;
                }

                let item = if enrich {
                    match self.enrich(item).await {
                        Ok(item) => item,
                        Err(e) => {
                            state = RunState::Failed;
                            error = Some(e);
                            break 'pages;
                        }
                    }
                } else {
                    item
                };

                raws.push(item);
                let status = format!("Collected {} item(s)", raws.len());
                self.progress(raws.len(), &status);
            }

            next = listing.next_page;
        }

        if state == RunState::Completed {
            tracing::info!(
                "Scrape of {} finished with {} raw items from {} page(s)",
                self.site.id,
                raws.len(),
                pages_fetched
            );
        }

        self.finish(state, raws, pages_fetched, error)
    }

    /// Decides whether a failed page aborts the run.
    ///
    /// The consecutive-error ceiling is always fatal. Below it, the
    /// skip-errors policy keeps partial results and ends the run normally;
    /// with skip-errors off, the original error is fatal.
    fn page_failure(&self, e: PricewrenError) -> FailurePolicy {
        let streak = self.errors.get();
        let ceiling = self.scraping.max_consecutive_errors;
        if streak >= ceiling {
            tracing::error!("Aborting: {} consecutive errors (ceiling {})", streak, ceiling);
            return FailurePolicy::Fatal(PricewrenError::ConsecutiveErrors {
                count: streak,
                ceiling,
            });
        }

        if self.scraping.skip_errors {
            tracing::warn!("Listing page failed, keeping partial results: {}", e);
            FailurePolicy::StopPagination
        } else {
            FailurePolicy::Fatal(e)
        }
    }

    /// Fetches and parses the item's detail page, merging the richer record
    /// over the listing summary. Detail failures fall back to the summary
    /// record under the skip-errors policy; an error here is fatal.
    async fn enrich(&mut self, summary: RawRecord) -> Result<RawRecord, PricewrenError> {
        let detail_url = match Url::parse(&summary.url) {
            Ok(url) => url,
            Err(_) => return Ok(summary),
        };

        let page = match self.fetcher.fetch(&detail_url).await {
            Ok(page) => page,
            Err(e) => return self.item_failure(summary, e.into()),
        };

        match self.parser.parse_detail(&page.body, &page.url) {
            Ok(detailed) => Ok(detailed),
            Err(e) => {
                self.errors.record_failure();
                self.item_failure(summary, e.into())
            }
        }
    }

    /// Item-level counterpart of [`Self::page_failure`]: under skip-errors
    /// the listing summary survives in place of the detail record.
    fn item_failure(
        &self,
        summary: RawRecord,
        e: PricewrenError,
    ) -> Result<RawRecord, PricewrenError> {
        let streak = self.errors.get();
        let ceiling = self.scraping.max_consecutive_errors;
        if streak >= ceiling {
            tracing::error!("Aborting: {} consecutive errors (ceiling {})", streak, ceiling);
            return Err(PricewrenError::ConsecutiveErrors {
                count: streak,
                ceiling,
            });
        }

        if self.scraping.skip_errors {
            tracing::warn!("Detail page failed for {}, keeping summary: {}", summary.url, e);
            Ok(summary)
        } else {
            Err(e)
        }
    }

    /// Case-insensitive substring match against the record's category and
    /// tags. No filter matches everything.
    fn matches_filter(&self, record: &RawRecord) -> bool {
        let filter = match &self.run.category_filter {
            Some(f) => f.trim().to_lowercase(),
            None => return true,
        };
        if filter.is_empty() {
            return true;
        }

        if record.category.to_lowercase().contains(&filter) {
            return true;
        }
        record
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&filter))
    }

    fn progress(&self, items: usize, status: &str) {
        // A closed channel only means the observer went away.
        let _ = self.events.send(ScrapeEvent::Progress(ProgressUpdate {
            items_collected: items,
            current_status: status.to_string(),
            is_running: true,
        }));
    }

    /// Processes the collected raw records and publishes the terminal event.
    fn finish(
        self,
        state: RunState,
        raws: Vec<RawRecord>,
        pages_fetched: u32,
        error: Option<PricewrenError>,
    ) -> ScrapeOutcome {
        let (dataset, stats) = self.processor.process_batch(&self.run.site, &raws);

        tracing::info!(
            "Run {} for {}: {} records kept, {} duplicates, {} dropped, quality {:.1}%",
            state,
            self.run.site,
            dataset.len(),
            stats.duplicates_removed,
            stats.dropped,
            dataset.quality_score()
        );

        let items = dataset.len();
        let event = match state {
            RunState::Stopped => ScrapeEvent::Stopped { items },
            RunState::Failed => ScrapeEvent::Failed {
                items,
                message: error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown error".to_string()),
            },
            _ => ScrapeEvent::Completed { items },
        };
        let _ = self.events.send(event);

        ScrapeOutcome {
            state,
            dataset,
            duplicates_removed: stats.duplicates_removed,
            dropped: stats.dropped,
            pages_fetched,
            error,
        }
    }
}
