//! Changeset types produced by the delta engine.
use livestate_traits::Pose;
use serde::Serialize;

/// Value of one changed field.
///
/// Serializes untagged, so a change renders as `{"path": "...", "value": 3}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Pose(Pose),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub path: String,
    pub value: FieldValue,
}

/// Field-level changes from one poll, stamped with the cursor after the poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Changeset {
    pub changes: Vec<Change>,
    pub cursor: u64,
}

impl Changeset {
    pub fn empty(cursor: u64) -> Self {
        Self {
            changes: Vec::new(),
            cursor,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.path.as_str())
    }

    /// Value emitted for `path`, if it changed.
    pub fn get(&self, path: &str) -> Option<&FieldValue> {
        self.changes
            .iter()
            .find(|c| c.path == path)
            .map(|c| &c.value)
    }
}
