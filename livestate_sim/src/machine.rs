use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use livestate_traits::status::{
    CommandEcho, CommandState, MAX_AXES, MAX_JOINTS, MotionType, Pose, RawPosition,
    StatusSnapshot, ToolEntry,
};
use livestate_traits::{
    BoxError, CommandStatusSource, PositionSource, SnapshotSource, ToolTableSource,
};
use parking_lot::Mutex;

use crate::error::{Result, SimError};
use crate::util::wait_until;

/// Static parameters of a simulated machine.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Feed/arc speed in units per second.
    pub feed_rate: f64,
    /// Traverse speed in units per second.
    pub rapid_rate: f64,
    pub joints: usize,
    pub tools: Vec<ToolEntry>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            feed_rate: 20.0,
            rapid_rate: 80.0,
            joints: 3,
            tools: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Move {
    target: Pose,
    kind: MotionType,
}

#[derive(Debug)]
struct Machine {
    snapshot: StatusSnapshot,
    /// Bumped on every observable change; snapshot sources compare against it.
    generation: u64,
    connected: bool,
    moves: VecDeque<Move>,
    feed_rate: f64,
    rapid_rate: f64,
    tools: Vec<ToolEntry>,
    tool_fault: Option<usize>,
    echo: CommandEcho,
}

fn distance(a: &Pose, b: &Pose) -> f64 {
    a.to_array()
        .iter()
        .zip(b.to_array())
        .map(|(x, y)| (y - x) * (y - x))
        .sum::<f64>()
        .sqrt()
}

fn lerp(from: &Pose, to: &Pose, t: f64) -> Pose {
    let (f, g) = (from.to_array(), to.to_array());
    Pose::from_array(std::array::from_fn(|i| f[i] + (g[i] - f[i]) * t))
}

impl Machine {
    fn new(cfg: SimConfig) -> Self {
        let mut snapshot = StatusSnapshot::default();
        let joints = cfg.joints.clamp(1, MAX_JOINTS);
        {
            let traj = &mut snapshot.motion.traj;
            traj.linear_units = 1.0;
            traj.angular_units = 1.0;
            traj.cycle_time = 0.001;
            traj.joints = i32::try_from(joints).unwrap_or(0);
            traj.spindles = 1;
            // One axis letter per joint, up to XYZABCUVW.
            traj.axis_mask = (1 << joints.min(MAX_AXES)) - 1;
            traj.enabled = true;
            traj.inpos = true;
            traj.scale = 1.0;
            traj.rapid_scale = 1.0;
            traj.max_velocity = cfg.rapid_rate;
            traj.feed_override_enabled = true;
        }
        for j in &mut snapshot.motion.joint[..joints] {
            j.enabled = true;
            j.homed = true;
            j.inpos = true;
            j.units = 1.0;
        }
        snapshot.motion.spindle[0].spindle_scale = 1.0;
        snapshot.motion.spindle[0].spindle_override_enabled = true;
        snapshot.task.program_units = 2;

        Self {
            snapshot,
            generation: 1,
            connected: true,
            moves: VecDeque::new(),
            feed_rate: cfg.feed_rate.max(f64::MIN_POSITIVE),
            rapid_rate: cfg.rapid_rate.max(f64::MIN_POSITIVE),
            tools: cfg.tools,
            tool_fault: None,
            echo: CommandEcho {
                echo_serial: 0,
                state: CommandState::Done,
            },
        }
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn rate_for(&self, kind: MotionType) -> f64 {
        match kind {
            MotionType::Traverse => self.rapid_rate,
            _ => self.feed_rate,
        }
    }

    fn step(&mut self, dt: Duration) {
        let idle = self.moves.is_empty() && self.snapshot.motion.traj.motion_type == 0;
        if idle {
            return;
        }

        let mut budget = dt.as_secs_f64();
        let mut pos = self.snapshot.motion.traj.position;
        let mut kind = MotionType::None;
        let mut vel = 0.0;
        while budget > 0.0 {
            let Some(mv) = self.moves.front().copied() else {
                break;
            };
            let rate = self.rate_for(mv.kind);
            let remaining = distance(&pos, &mv.target);
            kind = mv.kind;
            vel = rate;
            let reach = rate * budget;
            if reach >= remaining {
                pos = mv.target;
                budget -= remaining / rate;
                self.moves.pop_front();
            } else {
                pos = lerp(&pos, &mv.target, reach / remaining);
                budget = 0.0;
            }
        }
        if self.moves.is_empty() {
            kind = MotionType::None;
            vel = 0.0;
            // A motion command is done once its queue drains.
            if self.echo.state == CommandState::Executing {
                self.echo.state = CommandState::Done;
            }
        }

        let dtg = self
            .moves
            .front()
            .map_or(Pose::ZERO, |mv| mv.target - pos);
        let queued = i32::try_from(self.moves.len()).unwrap_or(i32::MAX);
        let traj = &mut self.snapshot.motion.traj;
        traj.position = pos;
        traj.actual_position = pos;
        traj.motion_type = kind.as_raw();
        traj.current_vel = vel;
        traj.dtg = dtg;
        traj.distance_to_go = distance(&Pose::ZERO, &dtg);
        traj.queue = queued;
        traj.inpos = queued == 0;
        let coords = pos.to_array();
        let joints = usize::try_from(traj.joints).unwrap_or(0).min(MAX_AXES);
        for (j, c) in self.snapshot.motion.joint[..joints].iter_mut().zip(coords) {
            j.input = c;
            j.output = c;
            j.velocity = vel;
            j.inpos = queued == 0;
        }
        self.bump();
    }
}

/// In-process stand-in for a running controller.
///
/// Cloning is cheap; all clones and all handed-out sources share one state.
#[derive(Debug, Clone)]
pub struct SimulatedMachine {
    inner: Arc<Mutex<Machine>>,
}

impl Default for SimulatedMachine {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimulatedMachine {
    pub fn new(cfg: SimConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Machine::new(cfg))),
        }
    }

    pub fn snapshot_source(&self) -> SimSnapshotSource {
        SimSnapshotSource {
            inner: Arc::clone(&self.inner),
            seen: 0,
        }
    }

    pub fn position_source(&self) -> SimPositionSource {
        SimPositionSource {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn tool_table(&self) -> SimToolTable {
        SimToolTable {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn command_status(&self) -> SimCommandStatus {
        SimCommandStatus {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn queue_move(&self, target: Pose, kind: MotionType) {
        let mut m = self.inner.lock();
        m.moves.push_back(Move { target, kind });
        m.snapshot.motion.traj.queue = i32::try_from(m.moves.len()).unwrap_or(i32::MAX);
        m.snapshot.motion.traj.inpos = false;
        m.bump();
    }

    pub fn queue_program(&self, program: impl IntoIterator<Item = (Pose, MotionType)>) {
        for (target, kind) in program {
            self.queue_move(target, kind);
        }
    }

    /// Advance simulated time by `dt`, interpolating along queued moves.
    pub fn step(&self, dt: Duration) {
        self.inner.lock().step(dt);
    }

    /// Apply an arbitrary edit to the status and publish it.
    pub fn update(&self, f: impl FnOnce(&mut StatusSnapshot)) {
        let mut m = self.inner.lock();
        f(&mut m.snapshot);
        m.bump();
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.lock().snapshot.clone()
    }

    pub fn position(&self) -> Pose {
        self.inner.lock().snapshot.motion.traj.position
    }

    pub fn is_idle(&self) -> bool {
        let m = self.inner.lock();
        m.moves.is_empty() && m.snapshot.motion.traj.motion_type == 0
    }

    pub fn set_connected(&self, connected: bool) {
        self.inner.lock().connected = connected;
    }

    /// Replace or append the tool-table slot at `index`.
    pub fn set_tool(&self, index: usize, entry: ToolEntry) {
        let mut m = self.inner.lock();
        if index < m.tools.len() {
            m.tools[index] = entry;
        } else {
            m.tools.resize(index, ToolEntry::default());
            m.tools.push(entry);
        }
        m.bump();
    }

    /// Make reads of one tool-table slot fail until cleared with `None`.
    pub fn set_tool_fault(&self, index: Option<usize>) {
        self.inner.lock().tool_fault = index;
    }

    /// Put `tool_no` in the spindle and apply its offset.
    pub fn load_tool(&self, tool_no: i32) -> Result<()> {
        let mut m = self.inner.lock();
        let offset = if tool_no == 0 {
            Pose::ZERO
        } else {
            m.tools
                .iter()
                .find(|t| t.tool_no == tool_no)
                .map(|t| t.offset)
                .ok_or(SimError::UnknownTool(tool_no))?
        };
        m.snapshot.io.tool.tool_in_spindle = tool_no;
        m.snapshot.task.tool_offset = offset;
        m.bump();
        Ok(())
    }

    /// Controller picks up command `serial` and starts executing it.
    pub fn accept_command(&self, serial: i32) {
        let mut m = self.inner.lock();
        m.echo = CommandEcho {
            echo_serial: serial,
            state: CommandState::Executing,
        };
        m.snapshot.echo_serial_number = serial;
        m.bump();
    }

    /// Resolve the last accepted command with `state`.
    pub fn finish_command(&self, state: CommandState) {
        let mut m = self.inner.lock();
        m.echo.state = state;
        m.bump();
    }

    /// Block until every queued move has been consumed.
    pub fn wait_idle(&self, timeout: Duration) -> Result<()> {
        wait_until(|| self.is_idle(), timeout, Duration::from_millis(1))
    }

    /// Step the machine in real time on a background thread.
    pub fn spawn_driver(&self, period: Duration) -> SimDriver {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let machine = self.clone();
        let period = if period.is_zero() {
            Duration::from_millis(1)
        } else {
            period
        };
        let handle = thread::spawn(move || {
            tracing::debug!(period_ms = period.as_millis(), "sim driver started");
            while !stop_flag.load(Ordering::Relaxed) {
                machine.step(period);
                thread::sleep(period);
            }
            tracing::debug!("sim driver exiting");
        });
        SimDriver {
            stop,
            handle: Some(handle),
        }
    }
}

/// Background stepper returned by [`SimulatedMachine::spawn_driver`]; stops on drop.
pub struct SimDriver {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimDriver {
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.handle.take()
            && let Err(e) = h.join()
        {
            tracing::warn!(?e, "sim driver thread panicked");
        }
    }
}

impl Drop for SimDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Yields a snapshot only when the machine changed since the last fetch.
#[derive(Debug)]
pub struct SimSnapshotSource {
    inner: Arc<Mutex<Machine>>,
    seen: u64,
}

impl SnapshotSource for SimSnapshotSource {
    fn try_fetch(&mut self) -> std::result::Result<Option<StatusSnapshot>, BoxError> {
        let m = self.inner.lock();
        if !m.connected {
            return Err(Box::new(SimError::Disconnected));
        }
        if m.generation == self.seen {
            return Ok(None);
        }
        self.seen = m.generation;
        Ok(Some(m.snapshot.clone()))
    }
}

#[derive(Debug)]
pub struct SimPositionSource {
    inner: Arc<Mutex<Machine>>,
}

impl PositionSource for SimPositionSource {
    fn connect(&mut self) -> std::result::Result<(), BoxError> {
        if self.inner.lock().connected {
            Ok(())
        } else {
            Err(Box::new(SimError::Disconnected))
        }
    }

    fn try_fetch(&mut self) -> std::result::Result<Option<RawPosition>, BoxError> {
        let m = self.inner.lock();
        if !m.connected {
            return Err(Box::new(SimError::Disconnected));
        }
        Ok(Some(RawPosition {
            position: m.snapshot.motion.traj.position,
            tool_offset: m.snapshot.task.tool_offset,
            motion_type: m.snapshot.motion.traj.motion_type,
        }))
    }
}

#[derive(Debug)]
pub struct SimToolTable {
    inner: Arc<Mutex<Machine>>,
}

impl ToolTableSource for SimToolTable {
    fn len(&self) -> usize {
        self.inner.lock().tools.len()
    }

    fn get(&self, index: usize) -> std::result::Result<ToolEntry, BoxError> {
        let m = self.inner.lock();
        if m.tool_fault == Some(index) {
            return Err(Box::new(SimError::ToolIndex(index)));
        }
        m.tools
            .get(index)
            .cloned()
            .ok_or_else(|| Box::new(SimError::ToolIndex(index)) as BoxError)
    }
}

#[derive(Debug)]
pub struct SimCommandStatus {
    inner: Arc<Mutex<Machine>>,
}

impl CommandStatusSource for SimCommandStatus {
    fn read(&mut self) -> std::result::Result<CommandEcho, BoxError> {
        let m = self.inner.lock();
        if !m.connected {
            return Err(Box::new(SimError::Disconnected));
        }
        Ok(m.echo)
    }
}

/// Short part program: rapid approach, a 10x10 square at feed, a
/// semicircular arc as eight chords, then retract.
pub fn demo_program() -> Vec<(Pose, MotionType)> {
    let mut program = vec![
        (Pose::xyz(0.0, 0.0, 5.0), MotionType::Traverse),
        (Pose::xyz(0.0, 0.0, 0.0), MotionType::Feed),
        (Pose::xyz(10.0, 0.0, 0.0), MotionType::Feed),
        (Pose::xyz(10.0, 10.0, 0.0), MotionType::Feed),
        (Pose::xyz(0.0, 10.0, 0.0), MotionType::Feed),
        (Pose::xyz(0.0, 0.0, 0.0), MotionType::Feed),
    ];
    for k in 1..=8 {
        let theta = std::f64::consts::PI * f64::from(k) / 8.0;
        program.push((
            Pose::xyz(5.0 - 5.0 * theta.cos(), -5.0 * theta.sin(), 0.0),
            MotionType::Arc,
        ));
    }
    program.push((Pose::xyz(10.0, 0.0, 5.0), MotionType::Traverse));
    program
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_source_reports_only_changes() {
        let sim = SimulatedMachine::default();
        let mut src = sim.snapshot_source();
        assert!(src.try_fetch().unwrap().is_some());
        assert!(src.try_fetch().unwrap().is_none());
        sim.update(|s| s.io.coolant.flood = true);
        let snap = src.try_fetch().unwrap().unwrap();
        assert!(snap.io.coolant.flood);
    }

    #[test]
    fn step_interpolates_at_feed_rate() {
        let sim = SimulatedMachine::new(SimConfig {
            feed_rate: 10.0,
            ..SimConfig::default()
        });
        sim.queue_move(Pose::xyz(10.0, 0.0, 0.0), MotionType::Feed);
        sim.step(Duration::from_millis(500));
        let snap = sim.snapshot();
        assert!((snap.motion.traj.position.x - 5.0).abs() < 1e-9);
        assert_eq!(snap.motion.traj.motion_type, MotionType::Feed.as_raw());
        assert!((snap.motion.traj.distance_to_go - 5.0).abs() < 1e-9);
        assert!(!snap.motion.traj.inpos);

        sim.step(Duration::from_secs(1));
        let snap = sim.snapshot();
        assert_eq!(snap.motion.traj.position, Pose::xyz(10.0, 0.0, 0.0));
        assert_eq!(snap.motion.traj.motion_type, 0);
        assert!(snap.motion.traj.inpos);
        assert!(sim.is_idle());
    }

    #[test]
    fn step_carries_leftover_time_into_next_move() {
        let sim = SimulatedMachine::new(SimConfig {
            feed_rate: 10.0,
            ..SimConfig::default()
        });
        sim.queue_move(Pose::xyz(1.0, 0.0, 0.0), MotionType::Feed);
        sim.queue_move(Pose::xyz(1.0, 4.0, 0.0), MotionType::Feed);
        sim.step(Duration::from_millis(200));
        let p = sim.position();
        assert!((p.x - 1.0).abs() < 1e-9);
        assert!((p.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disconnected_sources_fail() {
        let sim = SimulatedMachine::default();
        sim.set_connected(false);
        assert!(sim.snapshot_source().try_fetch().is_err());
        assert!(sim.position_source().connect().is_err());
        assert!(sim.command_status().read().is_err());
        sim.set_connected(true);
        assert!(sim.position_source().connect().is_ok());
    }

    #[test]
    fn load_tool_applies_offset_to_position_reading() {
        let sim = SimulatedMachine::new(SimConfig {
            tools: vec![ToolEntry {
                tool_no: 4,
                offset: Pose::xyz(0.0, 0.0, 2.5),
                ..ToolEntry::default()
            }],
            ..SimConfig::default()
        });
        sim.load_tool(4).unwrap();
        let raw = sim.position_source().try_fetch().unwrap().unwrap();
        assert_eq!(raw.tool_tip().z, -2.5);
        assert_eq!(sim.load_tool(9), Err(SimError::UnknownTool(9)));
    }

    #[test]
    fn tool_fault_is_per_index() {
        let sim = SimulatedMachine::default();
        sim.set_tool(1, ToolEntry {
            tool_no: 2,
            ..ToolEntry::default()
        });
        let table = sim.tool_table();
        assert_eq!(table.len(), 2);
        sim.set_tool_fault(Some(0));
        assert!(table.get(0).is_err());
        assert_eq!(table.get(1).unwrap().tool_no, 2);
        assert!(table.get(2).is_err());
    }

    #[test]
    fn command_echo_follows_accept_and_finish() {
        let sim = SimulatedMachine::default();
        let mut status = sim.command_status();
        sim.accept_command(7);
        assert_eq!(status.read().unwrap().state, CommandState::Executing);
        sim.finish_command(CommandState::Done);
        let echo = status.read().unwrap();
        assert_eq!(echo.echo_serial, 7);
        assert_eq!(echo.state, CommandState::Done);
        assert_eq!(sim.snapshot().echo_serial_number, 7);
    }

    #[test]
    fn motion_command_finishes_when_queue_drains() {
        let sim = SimulatedMachine::default();
        let mut status = sim.command_status();
        sim.accept_command(3);
        sim.queue_move(Pose::xyz(1.0, 0.0, 0.0), MotionType::Feed);
        sim.step(Duration::from_millis(10));
        assert_eq!(status.read().unwrap().state, CommandState::Executing);
        sim.step(Duration::from_secs(1));
        assert_eq!(status.read().unwrap().state, CommandState::Done);
    }

    #[test]
    fn demo_program_runs_to_completion_under_driver() {
        let sim = SimulatedMachine::new(SimConfig {
            feed_rate: 2000.0,
            rapid_rate: 8000.0,
            ..SimConfig::default()
        });
        sim.queue_program(demo_program());
        let mut driver = sim.spawn_driver(Duration::from_millis(1));
        sim.wait_idle(Duration::from_secs(5)).unwrap();
        driver.stop();
        assert_eq!(sim.position(), Pose::xyz(10.0, 0.0, 5.0));
    }
}
