//! Block detection and the fetch retry loop
//!
//! A fetch is retried only when its failure is transient (timeout, connection
//! trouble, or a page that looks blocked). The final failure is returned as a
//! result, never raised, so a stubborn site costs its own seed a few pages and
//! nothing more.

use log::{debug, warn};
use std::time::Duration;

use super::{FetchErrorKind, FetchResult, Fetcher};
use crate::utils::{
    BLOCKED_BACKOFF_MULTIPLIER, BLOCKED_MIN_TEXT_LEN, DEFAULT_FETCH_ATTEMPTS,
    DEFAULT_RETRY_BASE_MS,
};

/// Lowercase markers of anti-bot interstitials
pub const CHALLENGE_MARKERS: [&str; 4] = [
    "just a moment",
    "checking your browser",
    "attention required",
    "verify you are human",
];

/// How hard to retry a single URL
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub attempts: u32,
    /// Attempt `n` sleeps `n * base_sleep` before the next try
    pub base_sleep: Duration,
    /// Applied on top of the linear backoff when the page looked blocked
    pub blocked_backoff_multiplier: f64,
    /// A failure with less extracted text than this counts as blocked
    pub min_text_len: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_FETCH_ATTEMPTS,
            base_sleep: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
            blocked_backoff_multiplier: BLOCKED_BACKOFF_MULTIPLIER,
            min_text_len: BLOCKED_MIN_TEXT_LEN,
        }
    }
}

impl RetryPolicy {
    /// Sleep before the attempt following `attempt` (1-based)
    #[must_use]
    pub fn backoff(&self, attempt: u32, blocked: bool) -> Duration {
        let linear = self.base_sleep.saturating_mul(attempt);
        if blocked {
            linear.mul_f64(self.blocked_backoff_multiplier.max(1.0))
        } else {
            linear
        }
    }
}

/// Whether a fetch result looks like an anti-bot wall
///
/// True when the error text carries a known challenge marker, or when the
/// fetch failed and came back with next to no text.
#[must_use]
pub fn looks_blocked(result: &FetchResult, min_text_len: usize) -> bool {
    if result.is_blocked() {
        return true;
    }

    let error = result.error.to_lowercase();
    if CHALLENGE_MARKERS.iter().any(|marker| error.contains(marker)) {
        return true;
    }

    !result.ok && result.extracted_text.trim().chars().count() < min_text_len
}

fn is_transient(result: &FetchResult, blocked: bool) -> bool {
    blocked || result.error_kind.is_some_and(|kind| kind.is_transient())
}

/// Fetch `url`, retrying transient failures per `policy`
///
/// Returns the first successful result, the first non-transient failure, or
/// the last failure once attempts are exhausted. A final failure that looked
/// blocked is marked [`FetchErrorKind::Blocked`] so callers can surface it.
pub async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    url: &str,
    policy: &RetryPolicy,
) -> FetchResult {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        let mut result = fetcher.fetch(url).await;
        if result.ok {
            if attempt > 1 {
                debug!(target: "campusscrape::fetch", "{url} succeeded on attempt {attempt}");
            }
            return result;
        }

        let blocked = looks_blocked(&result, policy.min_text_len);
        let transient = is_transient(&result, blocked);

        if !transient || attempt >= attempts {
            if blocked {
                result.error_kind = Some(FetchErrorKind::Blocked);
                warn!(
                    target: "campusscrape::fetch",
                    "{url} still blocked after {attempt} attempt(s): {}",
                    result.error
                );
            } else {
                debug!(
                    target: "campusscrape::fetch",
                    "{url} failed after {attempt} attempt(s): {}",
                    result.error
                );
            }
            return result;
        }

        let delay = policy.backoff(attempt, blocked);
        debug!(
            target: "campusscrape::fetch",
            "{url} attempt {attempt}/{attempts} failed ({}), retrying in {delay:?}",
            result.error
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
