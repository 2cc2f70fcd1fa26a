// Focused tests for time helpers.
use std::time::Duration;

use livestate_core::SamplerCfg;
use livestate_core::util::{DEFAULT_INTERVAL, DEFAULT_MAX_HISTORY, ms_or, nonzero_or, sleep_budget};

#[test]
fn sleep_budget_saturates_on_overrun() {
    let p = Duration::from_millis(10);
    assert_eq!(sleep_budget(p, Duration::from_millis(3)), Duration::from_millis(7));
    assert_eq!(sleep_budget(p, Duration::from_millis(10)), Duration::ZERO);
    assert_eq!(sleep_budget(p, Duration::from_secs(1)), Duration::ZERO);
}

#[test]
fn zero_durations_fall_back() {
    assert_eq!(nonzero_or(Duration::ZERO, DEFAULT_INTERVAL), DEFAULT_INTERVAL);
    assert_eq!(ms_or(0, DEFAULT_INTERVAL), DEFAULT_INTERVAL);
    assert_eq!(ms_or(25, DEFAULT_INTERVAL), Duration::from_millis(25));
}

#[test]
fn sampler_cfg_normalizes_zeros() {
    let cfg = SamplerCfg {
        interval: Duration::ZERO,
        max_history: 0,
    }
    .normalized();
    assert_eq!(cfg.interval, DEFAULT_INTERVAL);
    assert_eq!(cfg.max_history, DEFAULT_MAX_HISTORY);

    let kept = SamplerCfg {
        interval: Duration::from_millis(3),
        max_history: 7,
    }
    .normalized();
    assert_eq!(kept.max_history, 7);
    assert_eq!(kept.interval, Duration::from_millis(3));
}
