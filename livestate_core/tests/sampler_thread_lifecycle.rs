//! Sampler thread lifecycle and end-to-end sampling.
//!
//! Verifies that:
//! - Start, stop and restart hand the source back and forth cleanly
//! - A failed connect leaves the sampler stopped and restartable
//! - Dropping a running sampler joins its thread promptly
//! - Clears requested while running are applied by the sampling thread
//! - Tool offsets are removed and straight runs are compressed
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use livestate_core::mocks::{NoPositions, ScriptedPositions};
use livestate_core::{MotionType, Pose, RawPosition, SamplerCfg, TrajectorySampler};
use livestate_sim::{SimConfig, SimulatedMachine, demo_program};

fn fast() -> SamplerCfg {
    SamplerCfg {
        interval: Duration::from_millis(1),
        max_history: 1000,
    }
}

fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn feed_at(x: f64, y: f64) -> RawPosition {
    RawPosition {
        position: Pose::xyz(x, y, 0.0),
        tool_offset: Pose::ZERO,
        motion_type: MotionType::Feed.as_raw(),
    }
}

#[test]
fn start_stop_restart() {
    let mut sampler = TrajectorySampler::new(NoPositions);
    assert!(!sampler.is_running());
    sampler.start(fast()).unwrap();
    assert!(sampler.is_running());
    sampler.stop();
    assert!(!sampler.is_running());
    // Stopping twice is fine.
    sampler.stop();
    sampler.start(fast()).unwrap();
    // Starting while running restarts.
    sampler.start(fast()).unwrap();
    assert!(sampler.is_running());
    assert_eq!(sampler.history_count(), 0);
}

#[test]
fn failed_connect_leaves_sampler_stopped_and_restartable() {
    let sim = SimulatedMachine::default();
    sim.set_connected(false);
    let mut sampler = TrajectorySampler::new(sim.position_source());
    assert!(sampler.start(fast()).is_err());
    assert!(!sampler.is_running());

    sim.set_connected(true);
    sampler.start(fast()).unwrap();
    wait_for("first sample", || sampler.current_position().is_some());
}

#[test]
fn sampler_thread_exits_on_drop() {
    let (_tx, source) = ScriptedPositions::channel();
    let mut sampler = TrajectorySampler::new(source);
    sampler
        .start(SamplerCfg {
            interval: Duration::from_millis(20),
            max_history: 10,
        })
        .unwrap();
    std::thread::sleep(Duration::from_millis(30));

    let t0 = Instant::now();
    drop(sampler);
    assert!(
        t0.elapsed() < Duration::from_millis(200),
        "drop took {:?}",
        t0.elapsed()
    );
}

#[test]
fn multiple_samplers_dont_leak_threads() {
    for _ in 0..10 {
        let mut sampler = TrajectorySampler::new(NoPositions);
        sampler.start(fast()).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        let _ = sampler.current_cursor();
        drop(sampler);
    }
}

#[test]
fn tool_offset_is_removed_and_runs_collapse() {
    let offset = Pose::xyz(0.0, 0.0, 2.0);
    let readings = (0..4).map(|i| RawPosition {
        position: Pose::xyz(f64::from(i), 0.0, 0.0),
        tool_offset: offset,
        motion_type: MotionType::Feed.as_raw(),
    });
    let source = ScriptedPositions::from_readings(readings);
    let fetches = source.fetch_counter();
    let mut sampler = TrajectorySampler::new(source);
    sampler.start(fast()).unwrap();
    wait_for("script drained", || fetches.load(Ordering::Relaxed) > 4);
    sampler.stop();

    let history = sampler.history(0, None);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].pose, Pose::xyz(3.0, 0.0, -2.0));
    assert_eq!(history[0].motion_type, MotionType::Feed);
    assert_eq!(sampler.current_cursor(), 3);
    assert_eq!(sampler.oldest_cursor(), 3);
}

#[test]
fn fetch_errors_skip_the_tick() {
    let (tx, source) = ScriptedPositions::channel();
    let mut sampler = TrajectorySampler::new(source);
    sampler.start(fast()).unwrap();
    tx.send(Ok(feed_at(0.0, 0.0))).unwrap();
    tx.send(Err("link down".into())).unwrap();
    tx.send(Ok(feed_at(1.0, 1.0))).unwrap();
    wait_for("two samples", || sampler.current_cursor() == 2);
    assert!(sampler.is_running());
}

#[test]
fn history_and_cursor_survive_restart() {
    let (tx, source) = ScriptedPositions::channel();
    let mut sampler = TrajectorySampler::new(source);
    sampler.start(fast()).unwrap();
    tx.send(Ok(feed_at(0.0, 0.0))).unwrap();
    tx.send(Ok(feed_at(1.0, 1.0))).unwrap();
    wait_for("two samples", || sampler.current_cursor() == 2);

    sampler.stop();
    sampler.start(fast()).unwrap();
    tx.send(Ok(feed_at(2.0, 0.0))).unwrap();
    wait_for("third sample", || sampler.current_cursor() == 3);
    assert_eq!(sampler.history_count(), 3);

    let d = sampler.delta_since(2);
    assert!(!d.was_reset);
    assert_eq!(d.points.len(), 1);
    assert_eq!(d.points[0].pose.x, 2.0);
}

#[test]
fn clear_and_wait_is_applied_by_running_thread() {
    let (tx, source) = ScriptedPositions::channel();
    let mut sampler = TrajectorySampler::new(source);
    sampler.start(fast()).unwrap();
    tx.send(Ok(feed_at(0.0, 0.0))).unwrap();
    tx.send(Ok(feed_at(1.0, 1.0))).unwrap();
    wait_for("two samples", || sampler.current_cursor() == 2);

    sampler.clear_and_wait(Duration::from_secs(2)).unwrap();
    assert_eq!(sampler.history_count(), 0);
    assert_eq!(sampler.oldest_cursor(), 3);
    assert!(sampler.delta_since(2).was_reset);

    // The compressor restarted too: the next two samples both append.
    tx.send(Ok(feed_at(5.0, 5.0))).unwrap();
    tx.send(Ok(feed_at(5.0, 5.0))).unwrap();
    wait_for("post-clear samples", || sampler.current_cursor() == 4);
    let d = sampler.delta_since(2);
    assert!(d.was_reset);
    assert_eq!(d.points.len(), sampler.history_count());
    assert_eq!(d.points[0].pose.x, 5.0);
}

#[test]
fn clear_while_stopped_applies_immediately() {
    let (tx, source) = ScriptedPositions::channel();
    let mut sampler = TrajectorySampler::new(source);
    sampler.start(fast()).unwrap();
    tx.send(Ok(feed_at(0.0, 0.0))).unwrap();
    wait_for("one sample", || sampler.current_cursor() == 1);
    sampler.stop();

    sampler.clear_and_wait(Duration::ZERO).unwrap();
    assert_eq!(sampler.history_count(), 0);
    assert_eq!(sampler.current_cursor(), 1);
    assert_eq!(sampler.oldest_cursor(), 2);
}

#[test]
fn samples_simulated_program() {
    let sim = SimulatedMachine::new(SimConfig {
        feed_rate: 200.0,
        rapid_rate: 400.0,
        ..SimConfig::default()
    });
    let mut sampler = TrajectorySampler::new(sim.position_source());
    sampler.start(fast()).unwrap();
    sim.queue_program(demo_program());
    let _driver = sim.spawn_driver(Duration::from_millis(1));
    sim.wait_idle(Duration::from_secs(5)).unwrap();

    let end = Pose::xyz(10.0, 0.0, 5.0);
    wait_for("final position", || {
        sampler
            .current_position()
            .is_some_and(|s| s.pose.bitwise_eq(&end))
    });
    sampler.stop();

    let history = sampler.history(0, None);
    assert!(!history.is_empty());
    assert!(history.len() <= sampler.current_cursor() as usize);
    for s in &history {
        assert!((-5.0 - 1e-9..=5.0 + 1e-9).contains(&s.pose.z), "{s:?}");
    }
    assert!(
        history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp),
        "history out of order"
    );
}
