//! Collinearity compression for sampled tool-tip paths.
//!
//! The compressor only decides; it never touches the buffer. Its decisions
//! are applied by [`TrajectoryBuffer::apply`](crate::history::TrajectoryBuffer::apply).
use livestate_traits::Pose;

use crate::history::PositionSample;

/// Per-component threshold below which a sample counts as unchanged.
pub const CHANGE_EPSILON: f64 = 1e-6;
/// Segment length below which collinearity is assumed.
pub const COLLINEAR_TINY: f64 = 1e-10;
/// Maximum `1 - cos(angle)` between consecutive segments to count as collinear.
pub const COLLINEAR_EPSILON: f64 = 1e-4;

/// What to do with one new sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Record {
    /// Nothing moved.
    Skip,
    /// Push a new entry and advance the cursor.
    Append(PositionSample),
    /// Overwrite the newest entry in place; the cursor does not move.
    Merge(PositionSample),
    /// The run started by the two bootstrap samples continues in a straight
    /// line: restart the buffer with this sample as its only entry.
    Collapse(PositionSample),
}

/// Any component moved by more than [`CHANGE_EPSILON`], or the motion type changed.
pub fn is_position_changed(last: &PositionSample, current: &PositionSample) -> bool {
    current.motion_type != last.motion_type
        || last
            .pose
            .to_array()
            .iter()
            .zip(current.pose.to_array())
            .any(|(a, b)| (b - a).abs() > CHANGE_EPSILON)
}

fn segment_len(from: &Pose, to: &Pose) -> f64 {
    let (dx, dy, dz) = (to.x - from.x, to.y - from.y, to.z - from.z);
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Collinearity of three points, on X/Y/Z only.
pub fn is_collinear(second_last: &Pose, last: &Pose, current: &Pose) -> bool {
    let v1 = [current.x - last.x, current.y - last.y, current.z - last.z];
    let v2 = [last.x - second_last.x, last.y - second_last.y, last.z - second_last.z];
    let len1 = segment_len(last, current);
    let len2 = segment_len(second_last, last);
    if len1 < COLLINEAR_TINY || len2 < COLLINEAR_TINY {
        return true;
    }
    let dot: f64 = v1.iter().zip(v2).map(|(a, b)| a * b).sum();
    1.0 - dot / (len1 * len2) < COLLINEAR_EPSILON
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    Empty,
    One,
    /// Both bootstrap samples recorded and nothing decided since.
    PairIntact,
    Running,
}

/// Stateful classifier over the stream of samples.
#[derive(Debug, Default, Clone)]
pub struct PathCompressor {
    last: Option<PositionSample>,
    second_last: Option<PositionSample>,
    phase: Phase,
}

impl PathCompressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget history, including the bootstrap state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn classify(&mut self, current: PositionSample) -> Record {
        let record = match (self.phase, self.second_last, self.last) {
            (Phase::Empty, ..) => {
                self.phase = Phase::One;
                Record::Append(current)
            }
            (Phase::One, ..) => {
                self.phase = Phase::PairIntact;
                Record::Append(current)
            }
            (phase, Some(second), Some(last)) => {
                if !is_position_changed(&last, &current) {
                    return Record::Skip;
                }
                let same_type = second.motion_type == last.motion_type
                    && last.motion_type == current.motion_type;
                let record = if same_type && is_collinear(&second.pose, &last.pose, &current.pose)
                {
                    // A bootstrap pair recorded at rest has no direction to
                    // collapse along; keep its start point.
                    if phase == Phase::PairIntact
                        && segment_len(&second.pose, &last.pose) >= COLLINEAR_TINY
                    {
                        Record::Collapse(current)
                    } else {
                        Record::Merge(current)
                    }
                } else {
                    Record::Append(current)
                };
                self.phase = Phase::Running;
                record
            }
            // Phase past bootstrap always has two samples.
            _ => Record::Append(current),
        };
        self.second_last = self.last;
        self.last = Some(current);
        record
    }
}
