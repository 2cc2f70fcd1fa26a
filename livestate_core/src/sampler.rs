//! Background trajectory sampling.
//!
//! A `TrajectorySampler` owns one thread at a time. The thread owns the
//! `PositionSource` and is the only writer of the shared buffer; readers take
//! the buffer lock briefly. Stopping joins the thread, which hands the source
//! back so the sampler can be started again.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use livestate_traits::clock::{Clock, MonotonicClock};
use livestate_traits::{MotionType, PositionSource};
use parking_lot::Mutex;

use crate::compress::{PathCompressor, Record};
use crate::config::SamplerCfg;
use crate::error::{LiveStateError, Result};
use crate::history::{PositionSample, TrajectoryBuffer, TrajectoryDelta};
use crate::source_error::{connection_failure, map_source_error};
use crate::util::sleep_budget;

struct Shared {
    buffer: Mutex<TrajectoryBuffer>,
    stop: AtomicBool,
    clear: AtomicBool,
}

pub struct TrajectorySampler<P, C = MonotonicClock> {
    shared: Arc<Shared>,
    /// Present while stopped; moved into the thread while running.
    source: Option<P>,
    join_handle: Option<JoinHandle<P>>,
    clock: C,
}

impl<P> TrajectorySampler<P, MonotonicClock>
where
    P: PositionSource + Send + 'static,
{
    pub fn new(source: P) -> Self {
        Self::with_clock(source, MonotonicClock::new())
    }
}

impl<P, C> TrajectorySampler<P, C>
where
    P: PositionSource + Send + 'static,
    C: Clock + Clone + Send + 'static,
{
    pub fn with_clock(source: P, clock: C) -> Self {
        Self {
            shared: Arc::new(Shared {
                buffer: Mutex::new(TrajectoryBuffer::new(SamplerCfg::default().max_history)),
                stop: AtomicBool::new(false),
                clear: AtomicBool::new(false),
            }),
            source: Some(source),
            join_handle: None,
            clock,
        }
    }

    /// (Re)start sampling.
    ///
    /// Any running thread is stopped first. The source is connected
    /// synchronously; if that fails the sampler stays stopped. Retained
    /// history and the cursor carry over across restarts.
    pub fn start(&mut self, cfg: SamplerCfg) -> Result<()> {
        self.stop();

        let mut source = self.source.take().ok_or_else(|| {
            eyre::Report::new(LiveStateError::State(
                "position source lost with a panicked sampler thread".into(),
            ))
        })?;
        if let Err(e) = source.connect() {
            self.source = Some(source);
            return Err(eyre::Report::new(connection_failure(&*e)));
        }

        let cfg = cfg.normalized();
        self.shared.buffer.lock().set_max_history(cfg.max_history);
        self.shared.stop.store(false, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let clock = self.clock.clone();
        tracing::debug!(
            interval_ms = cfg.interval.as_millis(),
            max_history = cfg.max_history,
            "trajectory sampler starting"
        );
        self.join_handle = Some(std::thread::spawn(move || {
            run(source, &shared, &clock, cfg.interval)
        }));
        Ok(())
    }

    /// Signal the thread and wait for it. No buffer writes happen after this
    /// returns.
    pub fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(source) => {
                    self.source = Some(source);
                    tracing::debug!("trajectory sampler stopped");
                }
                Err(e) => {
                    tracing::warn!(?e, "trajectory sampler thread panicked");
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.join_handle.is_some()
    }

    /// Request a clear; the sampling thread applies it at its next tick.
    pub fn clear(&self) {
        self.shared.clear.store(true, Ordering::Release);
    }

    /// Request a clear and wait until it has been applied.
    ///
    /// When stopped, the clear is applied immediately. Fails with
    /// `LiveStateError::Timeout` if the running thread does not get to it in
    /// time.
    pub fn clear_and_wait(&self, timeout: Duration) -> Result<()> {
        if !self.is_running() {
            self.shared.clear.store(false, Ordering::Release);
            self.shared.buffer.lock().clear();
            return Ok(());
        }
        self.clear();
        let deadline = self.clock.now() + timeout;
        while self.shared.clear.load(Ordering::Acquire) {
            let remaining = self.clock.remaining(deadline);
            if remaining.is_zero() {
                return Err(eyre::Report::new(LiveStateError::Timeout));
            }
            self.clock.sleep(remaining.min(Duration::from_millis(1)));
        }
        Ok(())
    }

    /// Newest recorded sample.
    pub fn current_position(&self) -> Option<PositionSample> {
        self.shared.buffer.lock().last().copied()
    }

    pub fn history(&self, start: usize, count: Option<usize>) -> Vec<PositionSample> {
        self.shared.buffer.lock().history(start, count)
    }

    pub fn history_count(&self) -> usize {
        self.shared.buffer.lock().len()
    }

    pub fn current_cursor(&self) -> u64 {
        self.shared.buffer.lock().cursor()
    }

    pub fn oldest_cursor(&self) -> u64 {
        self.shared.buffer.lock().oldest_cursor()
    }

    pub fn delta_since(&self, cursor: u64) -> TrajectoryDelta {
        self.shared.buffer.lock().delta_since(cursor)
    }
}

impl<P, C> Drop for TrajectorySampler<P, C> {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(handle) = self.join_handle.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!(?e, "trajectory sampler thread panicked during shutdown");
        }
    }
}

/// Thread body. Returns the source when asked to stop.
fn run<P, C>(mut source: P, shared: &Shared, clock: &C, interval: Duration) -> P
where
    P: PositionSource,
    C: Clock,
{
    let mut compressor = PathCompressor::new();
    while !shared.stop.load(Ordering::Acquire) {
        let tick = clock.now();

        if shared.clear.swap(false, Ordering::AcqRel) {
            shared.buffer.lock().clear();
            compressor.reset();
        }

        match source.try_fetch() {
            Ok(Some(raw)) => {
                let sample = PositionSample {
                    pose: raw.tool_tip(),
                    motion_type: MotionType::from_raw(raw.motion_type),
                    timestamp: tick,
                };
                let record = compressor.classify(sample);
                if record != Record::Skip {
                    shared.buffer.lock().apply(record);
                }
            }
            Ok(None) => tracing::trace!("no position this tick"),
            Err(e) => tracing::trace!(error = %map_source_error(&*e), "position fetch failed, tick skipped"),
        }

        if shared.stop.load(Ordering::Acquire) {
            break;
        }
        let elapsed = clock.now().saturating_duration_since(tick);
        clock.sleep(sleep_budget(interval, elapsed));
    }
    tracing::debug!("trajectory sampler thread exiting");
    source
}
