//! `trace`: sample the tool tip while the demo program runs.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use livestate_config::Config;
use livestate_core::{
    BuildError, EngineCfg, MotionType, PositionSample, SamplerCfg, TrajectoryDelta, TrajectorySampler,
};
use livestate_sim::demo_program;
use serde::Serialize;

use crate::sim::{DRIVER_PERIOD, build_machine};

#[derive(Serialize)]
struct TracePoint {
    x: f64,
    y: f64,
    z: f64,
    motion_type: MotionType,
    t_ms: u64,
}

#[derive(Serialize)]
struct TraceLine {
    cursor: u64,
    was_reset: bool,
    points: Vec<TracePoint>,
}

#[derive(Serialize)]
struct TraceSummary {
    retained: usize,
    cursor: u64,
    oldest_cursor: u64,
}

fn point(s: &PositionSample, t0: Instant) -> TracePoint {
    TracePoint {
        x: s.pose.x,
        y: s.pose.y,
        z: s.pose.z,
        motion_type: s.motion_type,
        t_ms: u64::try_from(s.timestamp.saturating_duration_since(t0).as_millis())
            .unwrap_or(u64::MAX),
    }
}

pub fn run_trace(
    cfg: &Config,
    ticks: Option<u64>,
    interval_ms: Option<u64>,
    max_history: Option<usize>,
    json: bool,
    shutdown: &AtomicBool,
) -> eyre::Result<()> {
    let machine = build_machine(&cfg.sim)?;
    let mut sampler_cfg = SamplerCfg::from(&cfg.sampler);
    match interval_ms {
        Some(0) => return Err(BuildError::InvalidConfig("--interval-ms must be > 0").into()),
        Some(ms) => sampler_cfg.interval = Duration::from_millis(ms),
        None => {}
    }
    match max_history {
        Some(0) => return Err(BuildError::InvalidConfig("--max-history must be >= 1").into()),
        Some(n) => sampler_cfg.max_history = n,
        None => {}
    }
    let read_every = EngineCfg::from(&cfg.engine).poll_interval;

    let t0 = Instant::now();
    let mut sampler = TrajectorySampler::new(machine.position_source());
    sampler.start(sampler_cfg)?;
    machine.queue_program(demo_program());
    let driver = machine.spawn_driver(DRIVER_PERIOD);
    tracing::info!(
        interval_ms = sampler_cfg.interval.as_millis(),
        max_history = sampler_cfg.max_history,
        "trace start"
    );

    let mut out = std::io::stdout().lock();
    let mut cursor = 0;
    let mut reads = 0u64;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("interrupted");
            break;
        }
        if ticks.is_some_and(|n| reads >= n) {
            break;
        }
        if ticks.is_none() && machine.is_idle() {
            // Let the sampler record the resting position.
            std::thread::sleep(sampler_cfg.interval * 3);
            break;
        }
        let delta = sampler.delta_since(cursor);
        cursor = delta.cursor;
        reads += 1;
        print_delta(&mut out, &delta, t0, json)?;
        std::thread::sleep(read_every);
    }
    sampler.stop();
    drop(driver);

    let delta = sampler.delta_since(cursor);
    print_delta(&mut out, &delta, t0, json)?;

    let summary = TraceSummary {
        retained: sampler.history_count(),
        cursor: sampler.current_cursor(),
        oldest_cursor: sampler.oldest_cursor(),
    };
    tracing::info!(
        retained = summary.retained,
        cursor = summary.cursor,
        reads,
        "trace complete"
    );
    if json {
        writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    } else {
        writeln!(
            out,
            "trace complete: {} points retained, cursor {}, oldest {}",
            summary.retained, summary.cursor, summary.oldest_cursor
        )?;
    }
    Ok(())
}

fn print_delta(
    out: &mut impl Write,
    delta: &TrajectoryDelta,
    t0: Instant,
    json: bool,
) -> eyre::Result<()> {
    if delta.points.is_empty() && !delta.was_reset {
        return Ok(());
    }
    if json {
        let line = TraceLine {
            cursor: delta.cursor,
            was_reset: delta.was_reset,
            points: delta.points.iter().map(|s| point(s, t0)).collect(),
        };
        writeln!(out, "{}", serde_json::to_string(&line)?)?;
        return Ok(());
    }
    if delta.was_reset {
        writeln!(out, "[{}] history reset", delta.cursor)?;
    }
    for s in &delta.points {
        let p = point(s, t0);
        writeln!(
            out,
            "[{}] {:>9.3} {:>9.3} {:>9.3} {:?} @{}ms",
            delta.cursor, p.x, p.y, p.z, p.motion_type, p.t_ms
        )?;
    }
    Ok(())
}
