//! Shared admission gate for outbound CMS requests.
//!
//! Every HTTP GET the importer makes goes through a single [`RateLimiter`]
//! instance so that list fetches and the per-page fan-out draw from one
//! quota. The limiter enforces two ceilings at once:
//!
//! - **Sliding window**: at most `requests_per_window` admissions inside any
//!   window of `window` duration.
//! - **In flight**: at most `max_in_flight` requests outstanding at any
//!   instant, counted from admission until the response body is fully read.
//!
//! Waiters are served in FIFO order: both the admission-log mutex and the
//! in-flight semaphore are tokio's fair primitives, so a queued request can
//! never be starved by later arrivals, and no request is dropped or
//! duplicated.
//!
//! # Sharing
//!
//! The ceilings are only meaningful process-wide. Construct one limiter in
//! `main` and hand every fetch operation a reference to it (or an `Arc`
//! when fetches are spawned); never build a limiter per call.

use std::collections::VecDeque;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, instrument};

/// Rate and concurrency ceilings for a [`RateLimiter`].
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum admissions inside any sliding window.
    pub requests_per_window: u32,
    /// Sliding window duration.
    pub window: Duration,
    /// Maximum requests in flight at once.
    pub max_in_flight: usize,
}

impl Default for RateLimitConfig {
    /// The CMS tolerates 1000 requests per 60 seconds.
    fn default() -> Self {
        Self {
            requests_per_window: 1000,
            window: Duration::from_secs(60),
            max_in_flight: 8,
        }
    }
}

/// A single outbound GET, created fresh per call.
///
/// `strict` controls how HTTP statuses are treated: a lenient request
/// resolves with the response body even on a non-2xx status (the CMS
/// signals most errors inside 200 responses, so the body still has to be
/// inspected), while a strict request turns non-2xx into an error.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub strict: bool,
}

impl FetchRequest {
    /// A request whose body is returned regardless of HTTP status.
    pub fn lenient(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            strict: false,
        }
    }

    /// A request that fails on any non-2xx status.
    pub fn strict(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            strict: true,
        }
    }
}

/// Errors surfaced by [`RateLimiter::admit`].
#[derive(Debug, Error)]
pub enum AdmitError {
    /// Connection failure, timeout, or a non-2xx status on a strict request.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The in-flight gate was closed. Cannot happen while the limiter is
    /// alive.
    #[error("rate limiter unavailable")]
    Unavailable,
}

/// Process-wide request gate. See the module docs for the invariants.
pub struct RateLimiter {
    client: reqwest::Client,
    config: RateLimitConfig,
    in_flight: Semaphore,
    /// Admission instants inside the current window, oldest first.
    admissions: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(mut config: RateLimitConfig) -> Self {
        // a zero quota could never admit anything
        config.requests_per_window = config.requests_per_window.max(1);
        config.max_in_flight = config.max_in_flight.max(1);
        let in_flight = Semaphore::new(config.max_in_flight);
        Self {
            client: reqwest::Client::new(),
            config,
            in_flight,
            admissions: Mutex::new(VecDeque::new()),
        }
    }

    /// Admit one request and return its raw body.
    ///
    /// Waits for a window slot and an in-flight slot (FIFO), issues the GET,
    /// and reads the full body. Lenient requests resolve with the body for
    /// any HTTP status; strict requests error on non-2xx. Transport
    /// failures error in all cases.
    #[instrument(level = "debug", skip_all, fields(url = %request.url, strict = request.strict))]
    pub async fn admit(&self, request: FetchRequest) -> Result<String, AdmitError> {
        self.reserve_window_slot().await;
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|_| AdmitError::Unavailable)?;

        let t0 = Instant::now();
        let response = self.client.get(&request.url).send().await?;
        let status = response.status();
        let response = if request.strict {
            response.error_for_status()?
        } else {
            response
        };
        let body = response.text().await?;

        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Request completed"
        );
        Ok(body)
    }

    /// Block until admitting one more request keeps the sliding window under
    /// its ceiling, then record the admission.
    ///
    /// The admission log mutex is held across the sleep: tokio's mutex is
    /// fair, so waiters are admitted in arrival order.
    async fn reserve_window_slot(&self) {
        let mut admissions = self.admissions.lock().await;
        loop {
            let now = Instant::now();
            while admissions
                .front()
                .is_some_and(|t| now.duration_since(*t) >= self.config.window)
            {
                admissions.pop_front();
            }

            if (admissions.len() as u32) < self.config.requests_per_window {
                admissions.push_back(now);
                return;
            }

            let Some(&oldest) = admissions.front() else {
                continue;
            };
            sleep_until(oldest + self.config.window).await;
        }
    }
}
