#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Live controller state: field-level deltas and sampled trajectories.
//!
//! All controller access goes through the source traits in
//! `livestate_traits`; nothing here knows about a particular transport.
//!
//! ## Architecture
//!
//! - **Delta engine**: snapshot pair plus cursor, emits `Changeset`s (`engine`)
//! - **Diff**: path-addressed comparison of the status tree (`diff`, `tool_table`)
//! - **Trajectory**: background sampler (`sampler`) feeding a collinearity
//!   compressor (`compress`) and a bounded cursor-addressed buffer (`history`)
//! - **Completion**: serial counter and echo-serial wait (`completion`)
//!
//! ## Cursors
//!
//! Both the engine and the trajectory buffer expose a cursor that only moves
//! forward. Readers keep the last cursor they saw and ask for what came after
//! it. The trajectory buffer additionally reports `was_reset` when the
//! requested cursor has fallen out of retained history.

pub mod changeset;
pub mod completion;
pub mod compress;
pub mod config;
pub mod conversions;
pub mod diff;
pub mod engine;
pub mod error;
pub mod history;
pub mod mocks;
pub mod sampler;
pub mod source_error;
pub mod tool_table;
pub mod util;

pub use changeset::{Change, Changeset, FieldValue};
pub use completion::{
    CompletionStatus, SequenceOutcome, SerialCounter, run_sequence, wait_complete,
};
pub use compress::{PathCompressor, Record};
pub use config::{CompletionCfg, EngineCfg, SamplerCfg};
pub use diff::{available_axes, field_paths};
pub use engine::{DeltaEngine, DeltaEngineBuilder};
pub use error::{BuildError, LiveStateError, Result};
pub use history::{PositionSample, TrajectoryBuffer, TrajectoryDelta};
pub use sampler::TrajectorySampler;
pub use tool_table::ToolTableShadow;

pub use livestate_traits::status;
pub use livestate_traits::{MotionType, Pose, RawPosition, StatusSnapshot, ToolEntry};
