//! Simulated machine controller.
//!
//! Implements every source trait from `livestate_traits` over one shared,
//! mutex-guarded status so the core and the CLI can run without a real
//! controller attached.
pub mod error;
pub mod machine;
pub mod util;

pub use error::SimError;
pub use machine::{
    SimCommandStatus, SimConfig, SimDriver, SimPositionSource, SimSnapshotSource, SimToolTable,
    SimulatedMachine, demo_program,
};
