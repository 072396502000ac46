//! Scrape engine - run lifecycle and single-run enforcement
//!
//! The engine owns the application configuration and enforces that at most
//! one scraping run is active at a time. Starting a run validates its
//! configuration, assembles the rate limiter, fetch client and parser, and
//! spawns the coordinator onto a worker task. The returned handle carries
//! the event channel, the cancellation flag, and the eventual outcome.

use crate::config::{validate_scrape_config, AppConfig, ScrapeConfig};
use crate::processing::Processor;
use crate::scrape::coordinator::{Coordinator, ScrapeOutcome};
use crate::scrape::events::{event_channel, CancelFlag, EventReceiver, ScrapeEvent};
use crate::scrape::fetcher::{ErrorCounter, FetchClient};
use crate::scrape::limiter::RateLimiter;
use crate::sites::parser_for;
use crate::{PricewrenError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Clears the engine's running flag when the worker task ends, panics
/// included.
struct ClearOnDrop(Arc<AtomicBool>);

impl Drop for ClearOnDrop {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to an in-flight scraping run
pub struct ScrapeHandle {
    events: EventReceiver,
    cancel: CancelFlag,
    task: JoinHandle<ScrapeOutcome>,
}

impl ScrapeHandle {
    /// Requests cooperative cancellation; the run stops at the next page
    /// boundary and keeps the records collected so far.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the run's cancellation flag, usable from other tasks.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Receives the next event, or `None` once the run is finished and all
    /// events have been drained.
    pub async fn next_event(&mut self) -> Option<ScrapeEvent> {
        self.events.recv().await
    }

    /// Waits for the run to finish and returns its outcome.
    pub async fn join(self) -> Result<ScrapeOutcome> {
        self.task.await.map_err(PricewrenError::from)
    }
}

/// Entry point for starting scraping runs
pub struct Engine {
    app: AppConfig,
    running: Arc<AtomicBool>,
}

impl Engine {
    pub fn new(app: AppConfig) -> Self {
        Self {
            app,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a run is currently active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts a scraping run.
    ///
    /// Validates the run configuration against the loaded application
    /// config, rejects the start if another run is active, and spawns the
    /// coordinator onto a worker task. The effective inter-request delay is
    /// the larger of the run's delay and the site's own rate limit.
    pub fn start(&self, run: ScrapeConfig) -> Result<ScrapeHandle> {
        validate_scrape_config(&run, &self.app)?;
        let site = self
            .app
            .site(&run.site)
            .ok_or_else(|| PricewrenError::UnknownSite(run.site.clone()))?
            .clone();

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PricewrenError::AlreadyRunning);
        }

        let delay = run.delay_secs.max(site.rate_limit_secs);
        let limiter = Arc::new(RateLimiter::new(
            Duration::from_secs_f64(delay),
            self.app.scraping.requests_per_minute,
        ));
        let errors = ErrorCounter::new();

        let fetcher = match FetchClient::new(&self.app.http, limiter, errors.clone()) {
            Ok(client) => client,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(PricewrenError::Http(e));
            }
        };

        let parser = parser_for(site.parser);
        let processor = Processor::new(self.app.processing.clone());
        let cancel = CancelFlag::new();
        let (events, receiver) = event_channel();

        let coordinator = Coordinator::new(
            site,
            run,
            self.app.scraping.clone(),
            fetcher,
            parser,
            processor,
            errors,
            cancel.clone(),
            events,
        );

        let guard = ClearOnDrop(Arc::clone(&self.running));
        let task = tokio::spawn(async move {
            let _guard = guard;
            coordinator.run().await
        });

        Ok(ScrapeHandle {
            events: receiver,
            cancel,
            task,
        })
    }
}
