//! ABOUTME: Backoff schedules for the two distinct failure modes the
//! ABOUTME: continuation loop retries: rate limits and provider overload

use rand::Rng;
use std::time::Duration;

pub const MAX_RETRIES: u32 = 5;
const RATE_LIMIT_BASE_DELAY_SECS: f64 = 2.0;
const RATE_LIMIT_MAX_BACKOFF_SECS: f64 = 60.0;
const OVERLOAD_MAX_BACKOFF_SECS: f64 = 32.0;

/// Jittered exponential backoff for rate-limit (429) responses. Does not
/// advance the attempt counter that bounds total continuation chunks — a
/// rate limit is a transport hiccup, not an indication the request itself
/// needs to change, so the same request is simply reissued after the delay.
///
/// `backoff_secs` is mutated in place (doubled, capped at 60s) so the
/// caller can thread it through successive retries of the same request.
pub fn rate_limit_delay(backoff_secs: &mut f64) -> Duration {
    let jitter = 0.1 * *backoff_secs * (0.5 - rand::thread_rng().gen::<f64>());
    let current = (*backoff_secs + jitter).min(RATE_LIMIT_MAX_BACKOFF_SECS).max(0.0);
    *backoff_secs = (*backoff_secs * 2.0).min(RATE_LIMIT_MAX_BACKOFF_SECS);
    Duration::from_secs_f64(current)
}

pub fn initial_rate_limit_backoff() -> f64 {
    RATE_LIMIT_BASE_DELAY_SECS
}

/// Backoff for provider overload / 5xx responses: `min(2^retry_count, 32)`
/// seconds, no jitter. Unlike the rate-limit schedule, this one does
/// advance a retry counter separate from the continuation attempt count,
/// since repeated overloads on the same request are a signal to give up
/// sooner than a rate limit would.
pub fn overload_delay(retry_count: u32) -> Duration {
    let secs = 2f64.powi(retry_count as i32).min(OVERLOAD_MAX_BACKOFF_SECS);
    Duration::from_secs_f64(secs)
}
