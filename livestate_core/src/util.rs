//! Common time helpers for livestate_core.
use std::time::Duration;

/// Sampling period used when none (or zero) is given.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);
/// Trajectory buffer capacity used when none (or zero) is given.
pub const DEFAULT_MAX_HISTORY: usize = 10_000;

/// `d`, or `default` when `d` is zero.
#[inline]
pub fn nonzero_or(d: Duration, default: Duration) -> Duration {
    if d.is_zero() { default } else { d }
}

/// Sleep needed to hold a fixed period after `elapsed` of work.
/// Saturates at zero when the tick overran.
#[inline]
pub fn sleep_budget(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

/// Milliseconds to `Duration`, with zero mapped to `default`.
#[inline]
pub fn ms_or(ms: u64, default: Duration) -> Duration {
    nonzero_or(Duration::from_millis(ms), default)
}
