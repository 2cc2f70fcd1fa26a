//! Shadow copy of the controller's tool table, diffed independently of the
//! fixed-shape status.
use livestate_traits::{ToolEntry, ToolTableSource};

use crate::changeset::Change;
use crate::diff::PathDiff;

/// Last-seen tool table. Grows to the largest length observed, never shrinks.
#[derive(Debug, Default, Clone)]
pub struct ToolTableShadow {
    entries: Vec<ToolEntry>,
}

impl ToolTableShadow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ToolEntry] {
        &self.entries
    }

    /// Compare every readable slot of `source` with the shadow, append changes
    /// under `toolTable.{index}.{field}`, and store what was read.
    ///
    /// Unreadable slots are skipped and keep their previous shadow value.
    pub fn diff(&mut self, source: &dyn ToolTableSource, force: bool, out: &mut Vec<Change>) {
        let n = source.len();
        if n > self.entries.len() {
            self.entries.resize(n, ToolEntry::default());
        }

        let mut d = PathDiff::new(out, force);
        d.scope("toolTable", |d| {
            for i in 0..n {
                let entry = match source.get(i) {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!(index = i, error = %e, "tool table slot unreadable, skipped");
                        continue;
                    }
                };
                let prev = &self.entries[i];
                d.scope(&i.to_string(), |d| diff_tool(d, &entry, prev));
                self.entries[i] = entry;
            }
        });
        debug_assert!(self.entries.len() >= n);
    }
}

fn diff_tool(d: &mut PathDiff<'_>, c: &ToolEntry, p: &ToolEntry) {
    d.field("toolNo", &c.tool_no, &p.tool_no);
    d.field("pocketNo", &c.pocket_no, &p.pocket_no);
    d.field("diameter", &c.diameter, &p.diameter);
    d.field("frontAngle", &c.front_angle, &p.front_angle);
    d.field("backAngle", &c.back_angle, &p.back_angle);
    d.field("orientation", &c.orientation, &p.orientation);
    d.field("offset", &c.offset, &p.offset);
    d.field("comment", &c.comment, &p.comment);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::FieldValue;
    use crate::mocks::VecToolTable;

    fn tool(no: i32, dia: f64) -> ToolEntry {
        ToolEntry {
            tool_no: no,
            pocket_no: no,
            diameter: dia,
            ..ToolEntry::default()
        }
    }

    #[test]
    fn new_slots_diff_against_default() {
        let table = VecToolTable::new(vec![Some(tool(1, 6.0))]);
        let mut shadow = ToolTableShadow::new();
        let mut out = Vec::new();
        shadow.diff(&table, false, &mut out);
        let paths: Vec<_> = out.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(
            paths,
            ["toolTable.0.toolNo", "toolTable.0.pocketNo", "toolTable.0.diameter"]
        );
        assert_eq!(shadow.len(), 1);
    }

    #[test]
    fn shrinking_source_keeps_shadow_length() {
        let mut shadow = ToolTableShadow::new();
        let mut out = Vec::new();
        shadow.diff(
            &VecToolTable::new(vec![Some(tool(1, 1.0)), Some(tool(2, 2.0))]),
            false,
            &mut out,
        );
        out.clear();
        shadow.diff(&VecToolTable::new(vec![Some(tool(1, 1.0))]), false, &mut out);
        assert!(out.is_empty());
        assert_eq!(shadow.len(), 2);
        assert_eq!(shadow.entries()[1].diameter, 2.0);
    }

    #[test]
    fn unreadable_slot_is_skipped_and_retains_shadow() {
        let mut shadow = ToolTableShadow::new();
        let mut out = Vec::new();
        shadow.diff(
            &VecToolTable::new(vec![Some(tool(1, 1.0)), Some(tool(2, 2.0))]),
            false,
            &mut out,
        );
        out.clear();
        shadow.diff(
            &VecToolTable::new(vec![None, Some(tool(2, 2.5))]),
            false,
            &mut out,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "toolTable.1.diameter");
        assert_eq!(out[0].value, FieldValue::Float(2.5));
        assert_eq!(shadow.entries()[0].diameter, 1.0);
    }

    #[test]
    fn force_emits_every_field_of_every_readable_slot() {
        let mut shadow = ToolTableShadow::new();
        let table = VecToolTable::new(vec![Some(tool(1, 1.0)), None]);
        let mut out = Vec::new();
        shadow.diff(&table, true, &mut out);
        assert_eq!(out.len(), 8);
        assert!(out.iter().all(|c| c.path.starts_with("toolTable.0.")));
        assert_eq!(shadow.len(), 2);
    }
}
