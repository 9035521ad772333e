//! Outbound request rate limiting
//!
//! Token bucket holding up to `requests_per_second` tokens, refilled
//! continuously at the same rate. Each call reserves a token up front and
//! then sleeps until its reservation matures, so concurrent callers are
//! served in arrival order.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::MapKitError;

/// Token bucket state
#[derive(Debug)]
struct TokenBucket {
    /// May go negative: outstanding reservations not yet covered by refill
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(max_tokens: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_update: Instant::now(),
        }
    }

    fn refill(&mut self, tokens_per_second: f64, max_tokens: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = elapsed
            .mul_add(tokens_per_second, self.tokens)
            .min(max_tokens);
        self.last_update = now;
    }

    /// Take one token and return how long the caller must wait for it
    fn reserve(&mut self, tokens_per_second: f64, max_tokens: f64) -> Duration {
        self.refill(tokens_per_second, max_tokens);
        self.tokens -= 1.0;

        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-self.tokens / tokens_per_second)
        }
    }

    /// Give back a reservation whose caller gave up
    fn release(&mut self, tokens_per_second: f64, max_tokens: f64) {
        self.refill(tokens_per_second, max_tokens);
        self.tokens = (self.tokens + 1.0).min(max_tokens);
    }
}

/// Limits outbound requests to a configured rate
///
/// Safe to share between concurrent requests; callers need no locking of
/// their own.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Option<Mutex<TokenBucket>>,
    tokens_per_second: f64,
    max_tokens: f64,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_second` with an equal burst
    ///
    /// Zero disables limiting.
    #[must_use]
    pub fn new(requests_per_second: u32) -> Self {
        let max_tokens = f64::from(requests_per_second);
        Self {
            bucket: (requests_per_second > 0).then(|| Mutex::new(TokenBucket::new(max_tokens))),
            tokens_per_second: max_tokens,
            max_tokens,
        }
    }

    /// A limiter that never blocks
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Whether limiting is active
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.bucket.is_some()
    }

    /// Wait for a token
    ///
    /// Returns immediately when limiting is disabled. If `cancel` fires
    /// before the token is available, the reservation is returned to the
    /// bucket and [`MapKitError::Cancelled`] is reported.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), MapKitError> {
        let Some(bucket) = &self.bucket else {
            return Ok(());
        };

        if cancel.is_cancelled() {
            return Err(MapKitError::Cancelled {
                context: "rate limiter",
            });
        }

        let wait = bucket
            .lock()
            .reserve(self.tokens_per_second, self.max_tokens);
        if wait.is_zero() {
            return Ok(());
        }

        trace!(wait_ms = wait.as_millis(), "Waiting for rate limiter token");

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                bucket.lock().release(self.tokens_per_second, self.max_tokens);
                Err(MapKitError::Cancelled { context: "rate limiter" })
            }
            () = tokio::time::sleep(wait) => Ok(()),
        }
    }
}
