use serde::Serialize;

use crate::XmlNode;

/// A single diff outcome, addressed by an XPath-style path.
///
/// Diffs are directional: `old` is the document being replaced and `new` the
/// document replacing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiffEntry {
    /// Element exists on both sides with identical content.
    Identical { path: String },
    /// Element exists on both sides but text/attributes differ.
    Modified {
        path: String,
        old: String,
        new: String,
    },
    /// Element only exists in the new document.
    Added { path: String, node: XmlNode },
    /// Element only exists in the old document.
    Removed { path: String, node: XmlNode },
    /// Elements cannot be compared (for example, different root tags).
    Structural { path: String, description: String },
}

impl DiffEntry {
    /// Path of the element this entry talks about.
    pub fn path(&self) -> &str {
        match self {
            DiffEntry::Identical { path }
            | DiffEntry::Modified { path, .. }
            | DiffEntry::Added { path, .. }
            | DiffEntry::Removed { path, .. }
            | DiffEntry::Structural { path, .. } => path,
        }
    }

    /// True for every variant except [`DiffEntry::Identical`].
    pub fn is_change(&self) -> bool {
        !matches!(self, DiffEntry::Identical { .. })
    }
}
