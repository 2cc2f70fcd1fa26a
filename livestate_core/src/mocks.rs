//! Test and helper sources for livestate_core.
//!
//! These are deterministic stand-ins for the controller transport. Each one
//! implements exactly one source trait.
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel as xch;
use livestate_traits::{
    BoxError, CommandEcho, CommandStatusSource, PositionSource, RawPosition, SnapshotSource,
    StatusSnapshot, ToolEntry, ToolTableSource,
};

/// A position source that never has data.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPositions;

impl PositionSource for NoPositions {
    fn try_fetch(&mut self) -> Result<Option<RawPosition>, BoxError> {
        Ok(None)
    }
}

/// One scripted reading: a position, or a fetch failure with this message.
pub type Scripted = Result<RawPosition, String>;

/// Position source fed through a channel. An empty channel reads as
/// `Ok(None)`, so the sampler just skips the tick.
#[derive(Debug)]
pub struct ScriptedPositions {
    rx: xch::Receiver<Scripted>,
    fetches: Arc<AtomicUsize>,
    refuse_connect: bool,
}

impl ScriptedPositions {
    /// Unbounded script; push readings through the returned sender.
    pub fn channel() -> (xch::Sender<Scripted>, Self) {
        let (tx, rx) = xch::unbounded();
        (
            tx,
            Self {
                rx,
                fetches: Arc::new(AtomicUsize::new(0)),
                refuse_connect: false,
            },
        )
    }

    /// Script that is already loaded with `readings`.
    pub fn from_readings(readings: impl IntoIterator<Item = RawPosition>) -> Self {
        let (tx, me) = Self::channel();
        for r in readings {
            // The receiver is alive in `me`, so this cannot fail.
            let _ = tx.send(Ok(r));
        }
        me
    }

    /// Make `connect()` fail.
    pub fn refusing_connect(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    /// Shared counter of `try_fetch` calls, readable after the source moved
    /// into a sampler thread.
    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetches)
    }
}

impl PositionSource for ScriptedPositions {
    fn connect(&mut self) -> Result<(), BoxError> {
        if self.refuse_connect {
            Err(Box::new(std::io::Error::other("connection refused")))
        } else {
            Ok(())
        }
    }

    fn try_fetch(&mut self) -> Result<Option<RawPosition>, BoxError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        match self.rx.try_recv() {
            Ok(Ok(raw)) => Ok(Some(raw)),
            Ok(Err(msg)) => Err(Box::new(std::io::Error::other(msg))),
            Err(_) => Ok(None),
        }
    }
}

/// Snapshot source replaying a fixed script, then reporting "nothing new".
#[derive(Debug, Default)]
pub struct ScriptedSnapshots {
    script: VecDeque<Result<Option<StatusSnapshot>, String>>,
}

impl ScriptedSnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, snapshot: StatusSnapshot) -> Self {
        self.script.push_back(Ok(Some(snapshot)));
        self
    }

    pub fn then_nothing(mut self) -> Self {
        self.script.push_back(Ok(None));
        self
    }

    pub fn then_fail(mut self, msg: &str) -> Self {
        self.script.push_back(Err(msg.to_owned()));
        self
    }
}

impl SnapshotSource for ScriptedSnapshots {
    fn try_fetch(&mut self) -> Result<Option<StatusSnapshot>, BoxError> {
        match self.script.pop_front() {
            Some(Ok(s)) => Ok(s),
            Some(Err(msg)) => Err(Box::new(std::io::Error::other(msg))),
            None => Ok(None),
        }
    }
}

/// Tool table backed by a vector; `None` slots fail to read.
#[derive(Debug, Default, Clone)]
pub struct VecToolTable {
    slots: Vec<Option<ToolEntry>>,
}

impl VecToolTable {
    pub fn new(slots: Vec<Option<ToolEntry>>) -> Self {
        Self { slots }
    }
}

impl ToolTableSource for VecToolTable {
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn get(&self, index: usize) -> Result<ToolEntry, BoxError> {
        match self.slots.get(index) {
            Some(Some(t)) => Ok(t.clone()),
            _ => Err(Box::new(std::io::Error::other(format!(
                "tool slot {index} unreadable"
            )))),
        }
    }
}

/// Command status replaying a script; the last reading repeats once the
/// script runs out.
#[derive(Debug)]
pub struct ScriptedCommandStatus {
    script: VecDeque<Result<CommandEcho, String>>,
    last: Option<CommandEcho>,
    reads: usize,
}

impl ScriptedCommandStatus {
    pub fn new(script: impl IntoIterator<Item = Result<CommandEcho, String>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: None,
            reads: 0,
        }
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl CommandStatusSource for ScriptedCommandStatus {
    fn read(&mut self) -> Result<CommandEcho, BoxError> {
        self.reads += 1;
        match self.script.pop_front() {
            Some(Ok(echo)) => {
                self.last = Some(echo);
                Ok(echo)
            }
            Some(Err(msg)) => Err(Box::new(std::io::Error::other(msg))),
            None => self
                .last
                .ok_or_else(|| Box::new(std::io::Error::other("no status yet")) as BoxError),
        }
    }
}
