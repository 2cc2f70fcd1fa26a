//! Command completion protocol.
//!
//! Every dispatched command carries a serial from [`SerialCounter`]. The
//! controller echoes the serial of the command it is working on together with
//! a status tag; [`wait_complete`] polls that echo until the command resolves
//! or the deadline passes.
use std::sync::atomic::{AtomicI32, Ordering};

use livestate_traits::clock::Clock;
use livestate_traits::{BoxError, CommandState, CommandStatusSource};

use crate::config::CompletionCfg;
use crate::error::Result;
use crate::source_error::map_source_error;

/// Hands out strictly increasing command serials.
#[derive(Debug, Default)]
pub struct SerialCounter {
    last: AtomicI32,
}

impl SerialCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue after a serial already used by someone else.
    pub fn starting_after(last: i32) -> Self {
        Self {
            last: AtomicI32::new(last),
        }
    }

    pub fn next(&self) -> i32 {
        self.last.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn last(&self) -> i32 {
        self.last.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Done,
    Error,
    Timeout,
}

/// Poll `source` until command `serial` resolves.
///
/// An echo beyond `serial` counts as done: the controller has moved on to a
/// later command. Read failures count as "no data this poll".
pub fn wait_complete<S, C>(
    source: &mut S,
    serial: i32,
    cfg: &CompletionCfg,
    clock: &C,
) -> CompletionStatus
where
    S: CommandStatusSource + ?Sized,
    C: Clock + ?Sized,
{
    let deadline = clock.now() + cfg.timeout;
    loop {
        match source.read() {
            Ok(echo) if echo.echo_serial > serial => return CompletionStatus::Done,
            Ok(echo) if echo.echo_serial == serial => match echo.state {
                CommandState::Done => return CompletionStatus::Done,
                CommandState::Error => return CompletionStatus::Error,
                CommandState::Executing => {}
            },
            Ok(_) => {}
            Err(e) => tracing::trace!(serial, error = %map_source_error(&*e), "status read failed"),
        }

        let remaining = clock.remaining(deadline);
        if remaining.is_zero() {
            tracing::debug!(serial, "command completion timed out");
            return CompletionStatus::Timeout;
        }
        clock.sleep(cfg.poll_interval.min(remaining));
    }
}

/// Result of [`run_sequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// All steps resolved `Done`.
    Completed { steps: usize },
    /// Step `step` (0-based) resolved `Error` or `Timeout`; later steps were
    /// not dispatched.
    Failed {
        step: usize,
        status: CompletionStatus,
    },
}

/// Dispatch steps one at a time, each only after the previous one completed.
///
/// A step receives its serial and sends the command. A dispatch error aborts
/// the sequence and is returned as `Err`.
pub fn run_sequence<S, C, F>(
    source: &mut S,
    serials: &SerialCounter,
    steps: impl IntoIterator<Item = F>,
    cfg: &CompletionCfg,
    clock: &C,
) -> Result<SequenceOutcome>
where
    S: CommandStatusSource + ?Sized,
    C: Clock + ?Sized,
    F: FnOnce(i32) -> std::result::Result<(), BoxError>,
{
    let mut done = 0;
    for (index, dispatch) in steps.into_iter().enumerate() {
        let serial = serials.next();
        dispatch(serial).map_err(|e| {
            eyre::Report::new(map_source_error(&*e))
                .wrap_err(format!("dispatching step {index} (serial {serial})"))
        })?;
        match wait_complete(source, serial, cfg, clock) {
            CompletionStatus::Done => done += 1,
            status => {
                return Ok(SequenceOutcome::Failed {
                    step: index,
                    status,
                });
            }
        }
    }
    Ok(SequenceOutcome::Completed { steps: done })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serials_strictly_increase() {
        let c = SerialCounter::starting_after(41);
        assert_eq!(c.next(), 42);
        assert_eq!(c.next(), 43);
        assert_eq!(c.last(), 43);
    }
}
