use std::time::{Duration, Instant};

use crate::error::{Result, SimError};

/// Poll `done` until it returns true or `timeout` expires.
/// Sleeps `poll_interval` between checks to avoid spinning.
pub fn wait_until(
    mut done: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !done() {
        let now = Instant::now();
        if now >= deadline {
            return Err(SimError::Timeout);
        }
        std::thread::sleep(poll_interval.min(deadline - now));
    }
    Ok(())
}
