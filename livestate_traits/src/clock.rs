use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time source used by the sampler and the completion wait.
///
/// `sleep` may be simulated; callers only rely on `now()` moving forward by at
/// least the slept amount.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
    }

    /// Time left until `deadline`; zero once it has passed.
    fn remaining(&self, deadline: Instant) -> Duration {
        deadline.saturating_duration_since(self.now())
    }
}

/// Real-time clock backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct State {
        offset: Duration,
        sleeps: Vec<Duration>,
    }

    /// Deterministic clock: `sleep(d)` advances time by `d` and records it.
    ///
    /// Clones share the same timeline, so a test can hold one handle while the
    /// code under test owns another.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        state: Arc<Mutex<State>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                state: Arc::new(Mutex::new(State::default())),
            }
        }

        pub fn advance(&self, d: Duration) {
            let mut st = self.state.lock();
            st.offset = st.offset.saturating_add(d);
        }

        /// Total simulated time since the clock was created.
        pub fn elapsed(&self) -> Duration {
            self.state.lock().offset
        }

        /// Every duration passed to `sleep`, in call order.
        pub fn sleeps(&self) -> Vec<Duration> {
            self.state.lock().sleeps.clone()
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.state.lock().offset
        }

        fn sleep(&self, d: Duration) {
            let mut st = self.state.lock();
            st.sleeps.push(d);
            st.offset = st.offset.saturating_add(d);
        }
    }

}
