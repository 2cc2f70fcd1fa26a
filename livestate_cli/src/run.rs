//! `run`: dispatch the demo program as individual commands and wait for each
//! to complete before sending the next.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use livestate_config::Config;
use livestate_core::error::{BuildError, LiveStateError};
use livestate_core::{CompletionCfg, CompletionStatus, SequenceOutcome, SerialCounter, run_sequence};
use livestate_sim::demo_program;
use livestate_traits::BoxError;
use livestate_traits::clock::MonotonicClock;
use serde_json::json;

use crate::sim::{DRIVER_PERIOD, build_machine};

pub fn run_program(
    cfg: &Config,
    timeout_ms: Option<u64>,
    json: bool,
    shutdown: &AtomicBool,
) -> eyre::Result<()> {
    let machine = build_machine(&cfg.sim)?;
    let mut completion = CompletionCfg::from(&cfg.completion);
    match timeout_ms {
        Some(0) => return Err(BuildError::InvalidConfig("--timeout-ms must be > 0").into()),
        Some(ms) => completion.timeout = Duration::from_millis(ms),
        None => {}
    }

    let mut status = machine.command_status();
    let serials = SerialCounter::new();
    let _driver = machine.spawn_driver(DRIVER_PERIOD);
    let program = demo_program();
    let total = program.len();
    tracing::info!(
        steps = total,
        timeout_ms = completion.timeout.as_millis(),
        "run start"
    );

    let steps = program.into_iter().map(|(target, kind)| {
        let m = machine.clone();
        move |serial: i32| -> Result<(), BoxError> {
            if shutdown.load(Ordering::Relaxed) {
                return Err("interrupted".into());
            }
            tracing::debug!(serial, ?kind, x = target.x, y = target.y, z = target.z, "dispatch");
            m.accept_command(serial);
            m.queue_move(target, kind);
            Ok(())
        }
    });
    let outcome = run_sequence(
        &mut status,
        &serials,
        steps,
        &completion,
        &MonotonicClock::new(),
    )?;

    let mut out = std::io::stdout().lock();
    match outcome {
        SequenceOutcome::Completed { steps } => {
            tracing::info!(steps, last_serial = serials.last(), "run complete");
            if json {
                writeln!(
                    out,
                    "{}",
                    json!({ "completed": steps, "last_serial": serials.last() })
                )?;
            } else {
                writeln!(out, "completed {steps} of {total} steps")?;
            }
            Ok(())
        }
        SequenceOutcome::Failed { step, status } => {
            tracing::error!(step, ?status, "run stopped");
            if json {
                writeln!(
                    out,
                    "{}",
                    json!({ "completed": step, "failed_step": step, "status": format!("{status:?}") })
                )?;
            }
            let err = match status {
                CompletionStatus::Timeout => LiveStateError::Timeout,
                _ => LiveStateError::State(format!("controller rejected step {step}")),
            };
            Err(eyre::Report::new(err).wrap_err(format!("program stopped at step {step}")))
        }
    }
}
