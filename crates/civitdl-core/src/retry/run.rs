//! Retry loop: run a closure until success or the policy says stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::classify::Retryable;
use super::policy::{RetryDecision, RetryPolicy};

const ABORT_POLL: Duration = Duration::from_millis(50);

/// Runs `f` until it succeeds or the retry policy says to stop.
///
/// `f` receives the 1-based attempt number. On a retryable failure the loop
/// sleeps for the backoff delay, then tries again. When `abort` is set the
/// loop stops at the next opportunity and returns the last error.
pub fn run_with_retry<T, E, F>(policy: &RetryPolicy, abort: Option<&AtomicBool>, f: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Result<T, E>,
{
    run_with_resume(policy, abort, || false, f)
}

/// `run_with_retry` for work that can resume where it stopped.
///
/// After each failed attempt `progressed` is asked whether that attempt got
/// anything done. If it did, the attempt number (and with it the backoff
/// exponent) starts over at 1, so a link that keeps dropping but keeps
/// moving forward never exhausts the budget.
pub fn run_with_resume<T, E, F, P>(
    policy: &RetryPolicy,
    abort: Option<&AtomicBool>,
    mut progressed: P,
    mut f: F,
) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Result<T, E>,
    P: FnMut() -> bool,
{
    let mut attempt = 1u32;
    loop {
        let e = match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        if progressed() && e.kind().is_retryable() {
            tracing::debug!(attempt, "attempt made progress, retry budget reset");
            attempt = 1;
        }
        match policy.decide(attempt, e.kind()) {
            RetryDecision::NoRetry => return Err(e),
            RetryDecision::RetryAfter(d) => {
                tracing::debug!(attempt, delay_ms = d.as_millis() as u64, "retrying after: {}", e);
                if !sleep_unless_aborted(d, abort) {
                    return Err(e);
                }
                attempt += 1;
            }
        }
    }
}

/// Sleeps for `d` in short slices. Returns false if `abort` was raised.
fn sleep_unless_aborted(d: Duration, abort: Option<&AtomicBool>) -> bool {
    let Some(abort) = abort else {
        std::thread::sleep(d);
        return true;
    };
    let deadline = Instant::now() + d;
    loop {
        if abort.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(ABORT_POLL));
    }
}
