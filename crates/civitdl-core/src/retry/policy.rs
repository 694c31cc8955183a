use std::time::Duration;

/// What went wrong, as far as retrying is concerned.
///
/// Curl errors, HTTP statuses and storage failures are mapped onto these in
/// `classify`; the policy never sees the underlying error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connect, read or low-speed timeout.
    Timeout,
    /// 429 or 503.
    Throttled,
    /// Reset, refused, DNS failure, body cut short.
    Connection,
    /// Any other 5xx.
    Http5xx(u16),
    /// The server answered a ranged GET without 206 Partial Content.
    Protocol,
    /// Not worth another attempt.
    Other,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::Other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    NoRetry,
    RetryAfter(Duration),
}

/// Attempt budget plus a capped exponential backoff curve.
///
/// One policy drives catalog requests and another (same curve, larger
/// budget) drives each chunk; both are built from `CivitdlConfig`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Doubling stops here so the multiplier cannot overflow.
const MAX_DOUBLINGS: u32 = 8;

impl RetryPolicy {
    /// Same curve with `retries` attempts allowed after the first.
    pub fn with_max_retries(self, retries: u32) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            ..self
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_attempts.saturating_sub(1)
    }

    /// Delay before the attempt following `attempt` (1-based):
    /// `base * 2^(attempt-1)`, never above `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(MAX_DOUBLINGS);
        self.base_delay
            .saturating_mul(1u32 << doublings)
            .min(self.max_delay)
    }

    /// Whether attempt number `attempt`, having failed with `kind`, gets another go.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts || !kind.is_retryable() {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff(attempt))
    }
}
