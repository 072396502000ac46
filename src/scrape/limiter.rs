//! Request rate limiter
//!
//! Enforces two independent limits before each outgoing request: a minimum
//! delay since the previous permit, and a requests-per-minute ceiling over a
//! sliding one-minute window. Permits are granted strictly in request order:
//! the limiter state sits behind a fair tokio mutex and the guard is held
//! across any waiting, so callers queue FIFO. The limiter never errors, it
//! only delays.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(60);

/// Rate limiter shared by all requests of one scraping run
pub struct RateLimiter {
    delay: Duration,
    per_minute: usize,
    inner: Mutex<LimiterState>,
}

#[derive(Debug)]
struct LimiterState {
    /// When the previous permit was granted
    last_grant: Option<Instant>,

    /// Grant times within the last minute
    window: VecDeque<Instant>,
}

impl RateLimiter {
    /// Creates a limiter with the given minimum inter-request delay and
    /// requests-per-minute budget.
    pub fn new(delay: Duration, per_minute: u32) -> Self {
        Self {
            delay,
            per_minute: per_minute.max(1) as usize,
            inner: Mutex::new(LimiterState {
                last_grant: None,
                window: VecDeque::new(),
            }),
        }
    }

    /// Waits until both limits allow another request, then grants a permit.
    pub async fn acquire(&self) {
        let mut state = self.inner.lock().await;

        loop {
            let now = Instant::now();

            // Drop grant times older than the window
            while let Some(front) = state.window.front() {
                if now.duration_since(*front) >= WINDOW {
                    state.window.pop_front();
                } else {
                    break;
                }
            }

            // Per-minute budget: wait until the oldest grant ages out
            if state.window.len() >= self.per_minute {
                if let Some(front) = state.window.front() {
                    let wait = WINDOW - now.duration_since(*front);
                    tracing::debug!("Request budget exhausted, waiting {:?}", wait);
                    tokio::time::sleep(wait).await;
                    continue;
                }
            }

            // Minimum spacing since the previous permit
            if let Some(last) = state.last_grant {
                let elapsed = now.duration_since(last);
                if elapsed < self.delay {
                    tokio::time::sleep(self.delay - elapsed).await;
                    continue;
                }
            }

            break;
        }

        let granted = Instant::now();
        state.last_grant = Some(granted);
        state.window.push_back(granted);
    }
}
