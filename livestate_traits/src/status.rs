//! Plain-data model of the controller's observable state.
//!
//! These types are produced by the sources (real transport or simulator) and
//! consumed by the delta engine and trajectory sampler. They are fixed-shape
//! values: a new snapshot replaces the old one wholesale.
use serde::{Deserialize, Serialize};

pub const MAX_JOINTS: usize = 16;
pub const MAX_AXES: usize = 9;
pub const MAX_SPINDLES: usize = 8;
pub const MAX_DIO: usize = 64;
pub const MAX_AIO: usize = 64;

/// Slots in the active G-code array; slot 0 carries the block line number.
pub const ACTIVE_G_CODES: usize = 17;
/// Slots in the active M-code array; slot 0 carries the block line number.
pub const ACTIVE_M_CODES: usize = 10;
/// Slots in the active settings array; slot 0 carries the block line number.
pub const ACTIVE_SETTINGS: usize = 5;

/// Nine-component rigid-body pose (three linear, six rotary/auxiliary).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub u: f64,
    pub v: f64,
    pub w: f64,
}

impl Pose {
    pub const ZERO: Pose = Pose {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        a: 0.0,
        b: 0.0,
        c: 0.0,
        u: 0.0,
        v: 0.0,
        w: 0.0,
    };

    /// Pose with only the linear components set.
    pub const fn xyz(x: f64, y: f64, z: f64) -> Self {
        Pose {
            x,
            y,
            z,
            ..Pose::ZERO
        }
    }

    pub const fn to_array(&self) -> [f64; 9] {
        [
            self.x, self.y, self.z, self.a, self.b, self.c, self.u, self.v, self.w,
        ]
    }

    pub const fn from_array(p: [f64; 9]) -> Self {
        Pose {
            x: p[0],
            y: p[1],
            z: p[2],
            a: p[3],
            b: p[4],
            c: p[5],
            u: p[6],
            v: p[7],
            w: p[8],
        }
    }

    /// Block comparison: equal only if every component has the same bit pattern.
    pub fn bitwise_eq(&self, other: &Pose) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl std::ops::Sub for Pose {
    type Output = Pose;

    fn sub(self, rhs: Pose) -> Pose {
        let (l, r) = (self.to_array(), rhs.to_array());
        Pose::from_array(std::array::from_fn(|i| l[i] - r[i]))
    }
}

/// Kind of motion the trajectory planner is executing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionType {
    #[default]
    None,
    Traverse,
    Feed,
    Arc,
    ToolChange,
    Probing,
    IndexRotary,
}

impl MotionType {
    /// Decode the controller's raw tag. Unknown codes read as `None`.
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            1 => MotionType::Traverse,
            2 => MotionType::Feed,
            3 => MotionType::Arc,
            4 => MotionType::ToolChange,
            5 => MotionType::Probing,
            6 => MotionType::IndexRotary,
            _ => MotionType::None,
        }
    }

    pub const fn as_raw(self) -> i32 {
        match self {
            MotionType::None => 0,
            MotionType::Traverse => 1,
            MotionType::Feed => 2,
            MotionType::Arc => 3,
            MotionType::ToolChange => 4,
            MotionType::Probing => 5,
            MotionType::IndexRotary => 6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStatus {
    pub mode: i32,
    pub state: i32,
    pub exec_state: i32,
    pub interp_state: i32,
    pub call_level: i32,
    pub motion_line: i32,
    pub current_line: i32,
    pub read_line: i32,
    pub optional_stop_state: bool,
    pub block_delete_state: bool,
    pub input_timeout: bool,
    pub file: String,
    pub command: String,
    pub ini_filename: String,
    pub g5x_offset: Pose,
    pub g5x_index: i32,
    pub g92_offset: Pose,
    pub rotation_xy: f64,
    pub tool_offset: Pose,
    pub active_gcodes: [i32; ACTIVE_G_CODES],
    pub active_mcodes: [i32; ACTIVE_M_CODES],
    pub active_settings: [f64; ACTIVE_SETTINGS],
    pub program_units: i32,
    pub delay_left: f64,
    pub task_paused: bool,
    pub interpreter_errcode: i32,
    pub queued_mdi_commands: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrajStatus {
    pub linear_units: f64,
    pub angular_units: f64,
    pub cycle_time: f64,
    pub joints: i32,
    pub spindles: i32,
    /// Bit `n` set means axis `XYZABCUVW[n]` is configured.
    pub axis_mask: i32,
    pub mode: i32,
    pub enabled: bool,
    pub inpos: bool,
    pub queue: i32,
    pub active_queue: i32,
    pub queue_full: bool,
    pub id: i32,
    pub paused: bool,
    pub scale: f64,
    pub rapid_scale: f64,
    pub position: Pose,
    pub actual_position: Pose,
    pub velocity: f64,
    pub acceleration: f64,
    pub max_velocity: f64,
    pub max_acceleration: f64,
    pub probed_position: Pose,
    pub probe_tripped: bool,
    pub probing: bool,
    pub probeval: i32,
    pub kinematics_type: i32,
    pub motion_type: i32,
    pub distance_to_go: f64,
    pub dtg: Pose,
    pub current_vel: f64,
    pub feed_override_enabled: bool,
    pub adaptive_feed_enabled: bool,
    pub feed_hold_enabled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointStatus {
    pub joint_type: i32,
    pub units: f64,
    pub backlash: f64,
    pub min_position_limit: f64,
    pub max_position_limit: f64,
    pub min_ferror: f64,
    pub max_ferror: f64,
    pub ferror_current: f64,
    pub ferror_high_mark: f64,
    pub output: f64,
    pub input: f64,
    pub velocity: f64,
    pub inpos: bool,
    pub homing: bool,
    pub homed: bool,
    pub fault: bool,
    pub enabled: bool,
    pub min_soft_limit: bool,
    pub max_soft_limit: bool,
    pub min_hard_limit: bool,
    pub max_hard_limit: bool,
    pub override_limits: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisStatus {
    pub min_position_limit: f64,
    pub max_position_limit: f64,
    pub velocity: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpindleStatus {
    pub speed: f64,
    pub spindle_scale: f64,
    pub css_maximum: f64,
    pub css_factor: f64,
    pub direction: i32,
    pub brake: bool,
    pub increasing: i32,
    pub enabled: bool,
    pub orient_state: i32,
    pub orient_fault: i32,
    pub spindle_override_enabled: bool,
    pub homed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionStatus {
    pub traj: TrajStatus,
    pub joint: [JointStatus; MAX_JOINTS],
    pub axis: [AxisStatus; MAX_AXES],
    pub spindle: [SpindleStatus; MAX_SPINDLES],
    pub digital_input: [i32; MAX_DIO],
    pub digital_output: [i32; MAX_DIO],
    pub analog_input: [f64; MAX_AIO],
    pub analog_output: [f64; MAX_AIO],
}

impl Default for MotionStatus {
    fn default() -> Self {
        Self {
            traj: TrajStatus::default(),
            joint: [JointStatus::default(); MAX_JOINTS],
            axis: [AxisStatus::default(); MAX_AXES],
            spindle: [SpindleStatus::default(); MAX_SPINDLES],
            digital_input: [0; MAX_DIO],
            digital_output: [0; MAX_DIO],
            analog_input: [0.0; MAX_AIO],
            analog_output: [0.0; MAX_AIO],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ToolStatus {
    pub pocket_prepped: i32,
    pub tool_in_spindle: i32,
    pub tool_from_pocket: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoolantStatus {
    pub mist: bool,
    pub flood: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IoStatus {
    pub tool: ToolStatus,
    pub coolant: CoolantStatus,
    pub estop: bool,
}

/// Complete observable controller state at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    pub echo_serial_number: i32,
    pub state: i32,
    pub task: TaskStatus,
    pub motion: MotionStatus,
    pub io: IoStatus,
    pub debug: i32,
}

/// One tool-table slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolEntry {
    pub tool_no: i32,
    pub pocket_no: i32,
    pub diameter: f64,
    pub front_angle: f64,
    pub back_angle: f64,
    pub orientation: i32,
    pub offset: Pose,
    pub comment: String,
}

/// Raw trajectory reading as delivered by a position source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawPosition {
    pub position: Pose,
    pub tool_offset: Pose,
    pub motion_type: i32,
}

impl RawPosition {
    /// Position with the active tool offset removed.
    pub fn tool_tip(&self) -> Pose {
        self.position - self.tool_offset
    }
}

/// Status tag reported alongside the echoed command serial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandState {
    Executing,
    Done,
    Error,
}

/// What the controller last acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEcho {
    pub echo_serial: i32,
    pub state: CommandState,
}
