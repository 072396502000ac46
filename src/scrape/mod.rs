//! Scraping functionality
//!
//! This module is organized into focused submodules:
//! - `limiter` - inter-request delay and requests-per-minute enforcement
//! - `fetcher` - rate-limited HTTP client with retry and backoff
//! - `events` - run states, progress events and cancellation
//! - `coordinator` - the per-run page-walking loop
//! - `engine` - run lifecycle and single-run enforcement

pub mod coordinator;
pub mod engine;
pub mod events;
pub mod fetcher;
pub mod limiter;

pub use coordinator::{Coordinator, ScrapeOutcome};
pub use engine::{Engine, ScrapeHandle};
pub use events::{
    event_channel, CancelFlag, EventReceiver, EventSender, ProgressUpdate, RunState, ScrapeEvent,
};
pub use fetcher::{build_http_client, ErrorCounter, FetchClient, FetchError, FetchedPage};
pub use limiter::RateLimiter;
