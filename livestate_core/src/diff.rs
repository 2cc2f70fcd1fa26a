//! Field-by-field comparison of status snapshots.
//!
//! Each leaf is compared through [`FieldKind`]; a leaf that differs (or every
//! leaf, when forced) is appended to the output as a dotted camelCase path.
use livestate_traits::Pose;
use livestate_traits::status::{
    AxisStatus, IoStatus, JointStatus, MotionStatus, SpindleStatus, StatusSnapshot, TaskStatus,
    TrajStatus,
};

use crate::changeset::{Change, FieldValue};

/// Comparison and conversion for one kind of leaf field.
pub trait FieldKind {
    /// Exact equality; floats compare by bit pattern.
    fn same(&self, other: &Self) -> bool;
    fn to_value(&self) -> FieldValue;
}

impl FieldKind for i32 {
    fn same(&self, other: &Self) -> bool {
        self == other
    }
    fn to_value(&self) -> FieldValue {
        FieldValue::Int(i64::from(*self))
    }
}

impl FieldKind for f64 {
    fn same(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
    fn to_value(&self) -> FieldValue {
        FieldValue::Float(*self)
    }
}

impl FieldKind for bool {
    fn same(&self, other: &Self) -> bool {
        self == other
    }
    fn to_value(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }
}

impl FieldKind for String {
    fn same(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
    fn to_value(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }
}

impl FieldKind for Pose {
    fn same(&self, other: &Self) -> bool {
        self.bitwise_eq(other)
    }
    fn to_value(&self) -> FieldValue {
        FieldValue::Pose(*self)
    }
}

/// Path-building comparator writing into a change list.
pub struct PathDiff<'a> {
    out: &'a mut Vec<Change>,
    force: bool,
    path: String,
}

impl<'a> PathDiff<'a> {
    pub fn new(out: &'a mut Vec<Change>, force: bool) -> Self {
        Self {
            out,
            force,
            path: String::with_capacity(64),
        }
    }

    fn join(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_owned()
        } else {
            let mut p = String::with_capacity(self.path.len() + 1 + name.len());
            p.push_str(&self.path);
            p.push('.');
            p.push_str(name);
            p
        }
    }

    pub fn field<T: FieldKind>(&mut self, name: &str, cur: &T, prev: &T) {
        if self.force || !cur.same(prev) {
            let path = self.join(name);
            self.out.push(Change {
                path,
                value: cur.to_value(),
            });
        }
    }

    /// Leaf whose emitted value is derived from another field.
    pub fn derived(&mut self, name: &str, changed: bool, value: impl FnOnce() -> FieldValue) {
        if self.force || changed {
            let path = self.join(name);
            self.out.push(Change {
                path,
                value: value(),
            });
        }
    }

    /// Run `f` with `name` appended to the current path.
    pub fn scope(&mut self, name: &str, f: impl FnOnce(&mut Self)) {
        let mark = self.path.len();
        if !self.path.is_empty() {
            self.path.push('.');
        }
        self.path.push_str(name);
        f(self);
        self.path.truncate(mark);
    }

    /// Scalar array: one leaf per index.
    pub fn array<T: FieldKind>(&mut self, name: &str, cur: &[T], prev: &[T]) {
        self.scope(name, |d| {
            for (i, (c, p)) in cur.iter().zip(prev).enumerate() {
                d.field(&i.to_string(), c, p);
            }
        });
    }

    /// Struct array: one scope per index, fields compared by `f`.
    pub fn each<T>(&mut self, name: &str, cur: &[T], prev: &[T], f: impl Fn(&mut Self, &T, &T)) {
        self.scope(name, |d| {
            for (i, (c, p)) in cur.iter().zip(prev).enumerate() {
                d.scope(&i.to_string(), |d| f(d, c, p));
            }
        });
    }
}

/// Named slots of the active G-code array (slot 0 is the line number, 12 unused).
pub const GCODE_GROUPS: [(&str, usize); 15] = [
    ("motionMode", 1),
    ("gMode0", 2),
    ("plane", 3),
    ("cutterComp", 4),
    ("units", 5),
    ("distanceMode", 6),
    ("feedRateMode", 7),
    ("origin", 8),
    ("toolLengthOffset", 9),
    ("retractMode", 10),
    ("pathControl", 11),
    ("spindleSpeedMode", 13),
    ("ijkDistanceMode", 14),
    ("latheDiameterMode", 15),
    ("g92Applied", 16),
];

pub const MCODE_GROUPS: [(&str, usize); 8] = [
    ("stopping", 1),
    ("spindleControl", 2),
    ("toolChange", 3),
    ("mistCoolant", 4),
    ("floodCoolant", 5),
    ("overrideControl", 6),
    ("adaptiveFeedControl", 7),
    ("feedHoldControl", 8),
];

pub const SETTINGS: [(&str, usize); 4] = [
    ("feedRate", 1),
    ("speed", 2),
    ("blendTolerance", 3),
    ("naiveCAMTolerance", 4),
];

const AXIS_LETTERS: [char; 9] = ['X', 'Y', 'Z', 'A', 'B', 'C', 'U', 'V', 'W'];

/// Decode a trajectory axis mask into axis letters, e.g. `0b111` -> `"XYZ"`.
pub fn available_axes(axis_mask: i32) -> String {
    AXIS_LETTERS
        .iter()
        .enumerate()
        .filter(|(bit, _)| axis_mask & (1 << bit) != 0)
        .map(|(_, c)| *c)
        .collect()
}

/// Append the changes between `cur` and `prev` (or every field, if `force`).
pub fn diff_status(cur: &StatusSnapshot, prev: &StatusSnapshot, force: bool, out: &mut Vec<Change>) {
    let mut d = PathDiff::new(out, force);
    d.field("echoSerialNumber", &cur.echo_serial_number, &prev.echo_serial_number);
    d.field("state", &cur.state, &prev.state);
    d.scope("task", |d| diff_task(d, &cur.task, &prev.task));
    d.scope("motion", |d| diff_motion(d, &cur.motion, &prev.motion));
    d.scope("io", |d| diff_io(d, &cur.io, &prev.io));
    d.field("debug", &cur.debug, &prev.debug);
}

/// Every path a forced poll emits for the status (tool table excluded), in order.
pub fn field_paths() -> Vec<String> {
    let snap = StatusSnapshot::default();
    let mut out = Vec::new();
    diff_status(&snap, &snap, true, &mut out);
    out.into_iter().map(|c| c.path).collect()
}

fn diff_task(d: &mut PathDiff<'_>, c: &TaskStatus, p: &TaskStatus) {
    d.field("mode", &c.mode, &p.mode);
    d.field("state", &c.state, &p.state);
    d.field("execState", &c.exec_state, &p.exec_state);
    d.field("interpState", &c.interp_state, &p.interp_state);
    d.field("callLevel", &c.call_level, &p.call_level);
    d.field("motionLine", &c.motion_line, &p.motion_line);
    d.field("currentLine", &c.current_line, &p.current_line);
    d.field("readLine", &c.read_line, &p.read_line);
    d.field("optionalStopState", &c.optional_stop_state, &p.optional_stop_state);
    d.field("blockDeleteState", &c.block_delete_state, &p.block_delete_state);
    d.field("inputTimeout", &c.input_timeout, &p.input_timeout);
    d.field("file", &c.file, &p.file);
    d.field("command", &c.command, &p.command);
    d.field("iniFilename", &c.ini_filename, &p.ini_filename);
    d.field("g5xOffset", &c.g5x_offset, &p.g5x_offset);
    d.field("g5xIndex", &c.g5x_index, &p.g5x_index);
    d.field("g92Offset", &c.g92_offset, &p.g92_offset);
    d.field("rotationXY", &c.rotation_xy, &p.rotation_xy);
    d.field("toolOffset", &c.tool_offset, &p.tool_offset);
    d.scope("activeGCodes", |d| {
        for (name, i) in GCODE_GROUPS {
            d.field(name, &c.active_gcodes[i], &p.active_gcodes[i]);
        }
    });
    d.scope("activeMCodes", |d| {
        for (name, i) in MCODE_GROUPS {
            d.field(name, &c.active_mcodes[i], &p.active_mcodes[i]);
        }
    });
    d.scope("activeSettings", |d| {
        for (name, i) in SETTINGS {
            d.field(name, &c.active_settings[i], &p.active_settings[i]);
        }
    });
    d.field("programUnits", &c.program_units, &p.program_units);
    d.field("delayLeft", &c.delay_left, &p.delay_left);
    d.field("taskPaused", &c.task_paused, &p.task_paused);
    d.field(
        "interpreterErrorCode",
        &c.interpreter_errcode,
        &p.interpreter_errcode,
    );
    d.field(
        "queuedMdiCommands",
        &c.queued_mdi_commands,
        &p.queued_mdi_commands,
    );
}

fn diff_motion(d: &mut PathDiff<'_>, c: &MotionStatus, p: &MotionStatus) {
    d.scope("traj", |d| diff_traj(d, &c.traj, &p.traj));
    d.each("joint", &c.joint, &p.joint, diff_joint);
    d.each("axis", &c.axis, &p.axis, diff_axis);
    d.each("spindle", &c.spindle, &p.spindle, diff_spindle);
    d.array("digitalInput", &c.digital_input, &p.digital_input);
    d.array("digitalOutput", &c.digital_output, &p.digital_output);
    d.array("analogInput", &c.analog_input, &p.analog_input);
    d.array("analogOutput", &c.analog_output, &p.analog_output);
}

fn diff_traj(d: &mut PathDiff<'_>, c: &TrajStatus, p: &TrajStatus) {
    d.field("linearUnits", &c.linear_units, &p.linear_units);
    d.field("angularUnits", &c.angular_units, &p.angular_units);
    d.field("cycleTime", &c.cycle_time, &p.cycle_time);
    d.field("joints", &c.joints, &p.joints);
    d.field("spindles", &c.spindles, &p.spindles);
    d.derived("availableAxes", c.axis_mask != p.axis_mask, || {
        FieldValue::Text(available_axes(c.axis_mask))
    });
    d.field("mode", &c.mode, &p.mode);
    d.field("enabled", &c.enabled, &p.enabled);
    d.field("inPosition", &c.inpos, &p.inpos);
    d.field("queue", &c.queue, &p.queue);
    d.field("activeQueue", &c.active_queue, &p.active_queue);
    d.field("queueFull", &c.queue_full, &p.queue_full);
    d.field("id", &c.id, &p.id);
    d.field("paused", &c.paused, &p.paused);
    d.field("feedRateOverride", &c.scale, &p.scale);
    d.field("rapidRateOverride", &c.rapid_scale, &p.rapid_scale);
    d.field("position", &c.position, &p.position);
    d.field("actualPosition", &c.actual_position, &p.actual_position);
    d.field("velocity", &c.velocity, &p.velocity);
    d.field("acceleration", &c.acceleration, &p.acceleration);
    d.field("maxVelocity", &c.max_velocity, &p.max_velocity);
    d.field("maxAcceleration", &c.max_acceleration, &p.max_acceleration);
    d.field("probedPosition", &c.probed_position, &p.probed_position);
    d.field("probeTripped", &c.probe_tripped, &p.probe_tripped);
    d.field("probing", &c.probing, &p.probing);
    d.field("probeVal", &c.probeval, &p.probeval);
    d.field("kinematicsType", &c.kinematics_type, &p.kinematics_type);
    d.field("motionType", &c.motion_type, &p.motion_type);
    d.field("distanceToGo", &c.distance_to_go, &p.distance_to_go);
    d.field("dtg", &c.dtg, &p.dtg);
    d.field("currentVel", &c.current_vel, &p.current_vel);
    d.field(
        "feedOverrideEnabled",
        &c.feed_override_enabled,
        &p.feed_override_enabled,
    );
    d.field(
        "adaptiveFeedEnabled",
        &c.adaptive_feed_enabled,
        &p.adaptive_feed_enabled,
    );
    d.field("feedHoldEnabled", &c.feed_hold_enabled, &p.feed_hold_enabled);
}

fn diff_joint(d: &mut PathDiff<'_>, c: &JointStatus, p: &JointStatus) {
    d.field("jointType", &c.joint_type, &p.joint_type);
    d.field("units", &c.units, &p.units);
    d.field("backlash", &c.backlash, &p.backlash);
    d.field("minPositionLimit", &c.min_position_limit, &p.min_position_limit);
    d.field("maxPositionLimit", &c.max_position_limit, &p.max_position_limit);
    d.field("minFerror", &c.min_ferror, &p.min_ferror);
    d.field("maxFerror", &c.max_ferror, &p.max_ferror);
    d.field("ferrorCurrent", &c.ferror_current, &p.ferror_current);
    d.field("ferrorHighMark", &c.ferror_high_mark, &p.ferror_high_mark);
    d.field("output", &c.output, &p.output);
    d.field("input", &c.input, &p.input);
    d.field("velocity", &c.velocity, &p.velocity);
    d.field("inPosition", &c.inpos, &p.inpos);
    d.field("homing", &c.homing, &p.homing);
    d.field("homed", &c.homed, &p.homed);
    d.field("fault", &c.fault, &p.fault);
    d.field("enabled", &c.enabled, &p.enabled);
    d.field("minSoftLimit", &c.min_soft_limit, &p.min_soft_limit);
    d.field("maxSoftLimit", &c.max_soft_limit, &p.max_soft_limit);
    d.field("minHardLimit", &c.min_hard_limit, &p.min_hard_limit);
    d.field("maxHardLimit", &c.max_hard_limit, &p.max_hard_limit);
    d.field("overrideLimits", &c.override_limits, &p.override_limits);
}

fn diff_axis(d: &mut PathDiff<'_>, c: &AxisStatus, p: &AxisStatus) {
    d.field("minPositionLimit", &c.min_position_limit, &p.min_position_limit);
    d.field("maxPositionLimit", &c.max_position_limit, &p.max_position_limit);
    d.field("velocity", &c.velocity, &p.velocity);
}

fn diff_spindle(d: &mut PathDiff<'_>, c: &SpindleStatus, p: &SpindleStatus) {
    d.field("speed", &c.speed, &p.speed);
    d.field("override", &c.spindle_scale, &p.spindle_scale);
    d.field("cssMaximum", &c.css_maximum, &p.css_maximum);
    d.field("cssFactor", &c.css_factor, &p.css_factor);
    d.field("direction", &c.direction, &p.direction);
    d.field("brake", &c.brake, &p.brake);
    d.field("increasing", &c.increasing, &p.increasing);
    d.field("enabled", &c.enabled, &p.enabled);
    d.field("orientState", &c.orient_state, &p.orient_state);
    d.field("orientFault", &c.orient_fault, &p.orient_fault);
    d.field(
        "spindleOverrideEnabled",
        &c.spindle_override_enabled,
        &p.spindle_override_enabled,
    );
    d.field("homed", &c.homed, &p.homed);
}

fn diff_io(d: &mut PathDiff<'_>, c: &IoStatus, p: &IoStatus) {
    d.scope("tool", |d| {
        d.field("pocketPrepped", &c.tool.pocket_prepped, &p.tool.pocket_prepped);
        d.field("toolInSpindle", &c.tool.tool_in_spindle, &p.tool.tool_in_spindle);
        d.field("toolFromPocket", &c.tool.tool_from_pocket, &p.tool.tool_from_pocket);
    });
    d.scope("coolant", |d| {
        d.field("mist", &c.coolant.mist, &p.coolant.mist);
        d.field("flood", &c.coolant.flood, &p.coolant.flood);
    });
    d.field("estop", &c.estop, &p.estop);
}
