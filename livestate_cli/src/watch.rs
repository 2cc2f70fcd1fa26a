//! `watch`: drive the demo program and stream status changesets.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use livestate_config::Config;
use livestate_core::{Changeset, DeltaEngine, EngineCfg};
use livestate_sim::demo_program;

use crate::sim::{DRIVER_PERIOD, build_machine};

pub fn run_watch(
    cfg: &Config,
    ticks: Option<u64>,
    full: bool,
    json: bool,
    shutdown: &AtomicBool,
) -> eyre::Result<()> {
    let machine = build_machine(&cfg.sim)?;
    let engine_cfg = EngineCfg::from(&cfg.engine);
    let mut engine = DeltaEngine::builder()
        .with_source(machine.snapshot_source())
        .with_tool_table(machine.tool_table())
        .try_build()?;

    machine.queue_program(demo_program());
    let _driver = machine.spawn_driver(DRIVER_PERIOD);
    tracing::info!(
        poll_ms = engine_cfg.poll_interval.as_millis(),
        ticks,
        full,
        "watch start"
    );

    let mut out = std::io::stdout().lock();
    let mut polls = 0u64;
    let mut emitted = 0usize;
    let mut force = full;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("interrupted");
            break;
        }
        if ticks.is_some_and(|n| polls >= n) {
            break;
        }
        let idle = machine.is_idle();
        let cs = match engine.poll(force) {
            Ok(cs) => cs,
            Err(e) => {
                tracing::info!(error = %e, polls, "connection to controller lost");
                return Err(e);
            }
        };
        force = false;
        polls += 1;
        if !cs.is_empty() {
            emitted += cs.len();
            print_changeset(&mut out, &cs, json)?;
        }
        // The last motion step is reported by the poll that sees the machine
        // idle; one more quiet poll means nothing else is coming.
        if ticks.is_none() && idle && cs.is_empty() {
            break;
        }
        std::thread::sleep(engine_cfg.poll_interval);
    }

    tracing::info!(polls, emitted, cursor = engine.cursor(), "watch complete");
    if !json {
        writeln!(
            out,
            "watch complete: {polls} polls, {emitted} changes, cursor {}",
            engine.cursor()
        )?;
    }
    Ok(())
}

fn print_changeset(out: &mut impl Write, cs: &Changeset, json: bool) -> eyre::Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(cs)?)?;
        return Ok(());
    }
    for change in &cs.changes {
        writeln!(
            out,
            "[{}] {} = {}",
            cs.cursor,
            change.path,
            serde_json::to_string(&change.value)?
        )?;
    }
    Ok(())
}
