use crate::diff::result::DiffEntry;

/// Format diff entries as plain text, one marker per line:
/// `=` identical, `~` modified, `+` added, `-` removed, `!` structural.
pub fn format_text(entries: &[DiffEntry]) -> String {
    let mut lines = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            DiffEntry::Identical { path } => lines.push(format!("= {path}")),
            DiffEntry::Modified { path, old, new } => {
                lines.push(format!("~ {path}"));
                lines.push(format!("    old: {old}"));
                lines.push(format!("    new: {new}"));
            }
            DiffEntry::Added { path, .. } => lines.push(format!("+ {path}")),
            DiffEntry::Removed { path, .. } => lines.push(format!("- {path}")),
            DiffEntry::Structural { path, description } => {
                lines.push(format!("! {path}: {description}"));
            }
        }
    }
    lines.join("\n")
}

/// One-line count of entries per kind.
pub fn format_summary(entries: &[DiffEntry]) -> String {
    let count = |pred: fn(&DiffEntry) -> bool| entries.iter().filter(|e| pred(e)).count();
    format!(
        "identical={} modified={} added={} removed={} structural={}",
        count(|e| matches!(e, DiffEntry::Identical { .. })),
        count(|e| matches!(e, DiffEntry::Modified { .. })),
        count(|e| matches!(e, DiffEntry::Added { .. })),
        count(|e| matches!(e, DiffEntry::Removed { .. })),
        count(|e| matches!(e, DiffEntry::Structural { .. })),
    )
}
