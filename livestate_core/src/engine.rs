//! Delta engine: turns successive status snapshots into cursor-stamped
//! changesets.
use livestate_traits::{SnapshotSource, StatusSnapshot, ToolEntry, ToolTableSource};

use crate::changeset::Changeset;
use crate::diff::diff_status;
use crate::error::{BuildError, LiveStateError, Result};
use crate::source_error::connection_failure;
use crate::tool_table::ToolTableShadow;

/// Tracks the last two snapshots and a cursor that advances once per
/// non-empty changeset.
///
/// `poll` takes `&mut self`; share an engine between threads by wrapping it in
/// a mutex.
pub struct DeltaEngine<S> {
    source: S,
    tools: Option<Box<dyn ToolTableSource + Send>>,
    tool_shadow: ToolTableShadow,
    current: StatusSnapshot,
    previous: StatusSnapshot,
    cursor: u64,
}

impl<S> core::fmt::Debug for DeltaEngine<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeltaEngine")
            .field("cursor", &self.cursor)
            .field("has_tool_table", &self.tools.is_some())
            .field("tool_shadow_len", &self.tool_shadow.len())
            .finish_non_exhaustive()
    }
}

impl<S: SnapshotSource> DeltaEngine<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            tools: None,
            tool_shadow: ToolTableShadow::new(),
            current: StatusSnapshot::default(),
            previous: StatusSnapshot::default(),
            cursor: 0,
        }
    }

    pub fn builder() -> DeltaEngineBuilder<S> {
        DeltaEngineBuilder::default()
    }

    /// Fetch from the source and report what changed.
    ///
    /// With `force`, every field (and every readable tool slot) is emitted
    /// even if the source had nothing new. An attached tool table is compared
    /// on every call. A fetch error leaves all state untouched.
    pub fn poll(&mut self, force: bool) -> Result<Changeset> {
        let fetched = self
            .source
            .try_fetch()
            .map_err(|e| eyre::Report::new(connection_failure(&*e)))?;

        let fresh = match fetched {
            Some(snapshot) => {
                self.current = snapshot;
                true
            }
            None => false,
        };
        // The tool table is not part of the snapshot and is diffed on every
        // poll, fresh status or not.
        if !fresh && !force && self.tools.is_none() {
            return Ok(Changeset::empty(self.cursor));
        }

        let mut changes = Vec::new();
        if fresh || force {
            diff_status(&self.current, &self.previous, force, &mut changes);
            self.previous.clone_from(&self.current);
        }
        if let Some(tools) = self.tools.as_deref() {
            self.tool_shadow.diff(tools, force, &mut changes);
        }

        if !changes.is_empty() {
            self.cursor += 1;
        }
        Ok(Changeset {
            changes,
            cursor: self.cursor,
        })
    }

    /// Cursor of the last non-empty changeset; 0 before any.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Last snapshot fetched from the source.
    pub fn current(&self) -> &StatusSnapshot {
        &self.current
    }

    pub fn tool_shadow(&self) -> &[ToolEntry] {
        self.tool_shadow.entries()
    }

    /// Look up a tool by number in the live tool table.
    ///
    /// Tool 0 means "empty spindle" and has no table entry of its own.
    pub fn tool_info(&self, tool_no: i32) -> Result<ToolEntry> {
        if tool_no == 0 {
            return Err(eyre::Report::new(LiveStateError::Tool(
                "tool 0 is the empty spindle; read the spindle slot from the tool table instead"
                    .into(),
            )));
        }
        let tools = self
            .tools
            .as_deref()
            .ok_or_else(|| eyre::Report::new(LiveStateError::Tool("no tool table attached".into())))?;
        tools.find(tool_no).ok_or_else(|| {
            eyre::Report::new(LiveStateError::Tool(format!(
                "tool {tool_no} not in tool table"
            )))
        })
    }
}

/// Builder for [`DeltaEngine`].
pub struct DeltaEngineBuilder<S> {
    source: Option<S>,
    tools: Option<Box<dyn ToolTableSource + Send>>,
}

impl<S> Default for DeltaEngineBuilder<S> {
    fn default() -> Self {
        Self {
            source: None,
            tools: None,
        }
    }
}

impl<S: SnapshotSource> DeltaEngineBuilder<S> {
    pub fn with_source(mut self, source: S) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_tool_table(mut self, tools: impl ToolTableSource + Send + 'static) -> Self {
        self.tools = Some(Box::new(tools));
        self
    }

    pub fn try_build(self) -> Result<DeltaEngine<S>> {
        let source = self
            .source
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSource))?;
        let mut engine = DeltaEngine::new(source);
        engine.tools = self.tools;
        Ok(engine)
    }
}
