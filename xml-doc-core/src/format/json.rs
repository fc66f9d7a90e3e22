use crate::diff::result::DiffEntry;

/// Format diff entries as pretty-printed JSON.
pub fn format_json(entries: &[DiffEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(entries)
}
