//! Boundary traits between the live-state core and whatever produces the data
//! (the controller transport in production, `livestate_sim` in tests).
//!
//! Errors crossing these traits are boxed; the core maps them to its own
//! typed errors.
pub mod clock;
pub mod status;

pub use clock::{Clock, MonotonicClock};
pub use status::{
    CommandEcho, CommandState, MotionType, Pose, RawPosition, StatusSnapshot, ToolEntry,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Supplies full status snapshots.
pub trait SnapshotSource {
    /// Non-blocking. `Ok(None)` means nothing new since the last call.
    fn try_fetch(&mut self) -> Result<Option<StatusSnapshot>, BoxError>;
}

/// Supplies raw trajectory positions to the sampler thread.
pub trait PositionSource {
    /// Establish the connection; called once, synchronously, on sampler start.
    fn connect(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Non-blocking. `Ok(None)` means no fresh reading this tick.
    fn try_fetch(&mut self) -> Result<Option<RawPosition>, BoxError>;
}

/// Read access to the controller's tool table.
pub trait ToolTableSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<ToolEntry, BoxError>;

    /// Look up a slot by tool number. Unreadable slots are ignored.
    fn find(&self, tool_no: i32) -> Option<ToolEntry> {
        (0..self.len())
            .filter_map(|i| self.get(i).ok())
            .find(|t| t.tool_no == tool_no)
    }
}

/// Reports the last command serial the controller echoed back.
pub trait CommandStatusSource {
    fn read(&mut self) -> Result<CommandEcho, BoxError>;
}

impl<T: SnapshotSource + ?Sized> SnapshotSource for Box<T> {
    fn try_fetch(&mut self) -> Result<Option<StatusSnapshot>, BoxError> {
        (**self).try_fetch()
    }
}

impl<T: PositionSource + ?Sized> PositionSource for Box<T> {
    fn connect(&mut self) -> Result<(), BoxError> {
        (**self).connect()
    }

    fn try_fetch(&mut self) -> Result<Option<RawPosition>, BoxError> {
        (**self).try_fetch()
    }
}

impl<T: CommandStatusSource + ?Sized> CommandStatusSource for Box<T> {
    fn read(&mut self) -> Result<CommandEcho, BoxError> {
        (**self).read()
    }
}
