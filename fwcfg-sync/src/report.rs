use std::collections::BTreeMap;

use colored::Colorize;
use xml_doc_core::{format_summary, format_text, DiffEntry};

use crate::plan::{PendingOperation, PlannedChange};
use crate::value::Value;

/// Render diff entries for terminal output.
pub fn render_text(entries: &[DiffEntry]) -> String {
    format_text(entries)
        .lines()
        .map(color_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn color_line(line: &str) -> String {
    if line.starts_with('+') {
        line.green().to_string()
    } else if line.starts_with('-') {
        line.red().to_string()
    } else if line.starts_with('~') {
        line.yellow().to_string()
    } else if line.starts_with('!') {
        line.magenta().to_string()
    } else {
        line.to_string()
    }
}

/// Render summary counts for terminal output.
pub fn render_summary(entries: &[DiffEntry]) -> String {
    format_summary(entries).cyan().to_string()
}

/// Render pending operations, one marker per node. No-ops are listed only
/// with `verbose`.
pub fn render_plan(planned: &[PlannedChange], verbose: bool) -> String {
    let mut out = Vec::new();
    for change in planned {
        let label = match &change.name {
            Some(name) => format!("{} '{name}'", change.kind),
            None => change.kind.to_string(),
        };
        match &change.operation {
            PendingOperation::Create => out.push(color_line(&format!("+ create {label}"))),
            PendingOperation::Delete => out.push(color_line(&format!("- delete {label}"))),
            PendingOperation::Update { changes } => {
                out.push(color_line(&format!("~ update {label}")));
                for line in format_text(changes).lines() {
                    out.push(format!("    {line}"));
                }
            }
            PendingOperation::NoOp if verbose => out.push(format!("= unchanged {label}")),
            PendingOperation::NoOp => {}
        }
        if verbose {
            out.push(format!("    at {}", change.xpath).dimmed().to_string());
        }
    }

    let count = |pred: fn(&PendingOperation) -> bool| {
        planned.iter().filter(|c| pred(&c.operation)).count()
    };
    out.push(
        format!(
            "create={} update={} delete={} unchanged={}",
            count(|o| matches!(o, PendingOperation::Create)),
            count(|o| matches!(o, PendingOperation::Update { .. })),
            count(|o| matches!(o, PendingOperation::Delete)),
            count(|o| matches!(o, PendingOperation::NoOp)),
        )
        .cyan()
        .to_string(),
    );
    out.join("\n")
}

/// Render `about()` maps under a heading per node. Unset parameters show `-`.
pub fn render_objects(rows: &[(String, BTreeMap<String, Option<Value>>)]) -> String {
    let mut out = Vec::new();
    for (label, params) in rows {
        out.push(label.bold().to_string());
        for (name, value) in params {
            let rendered = value
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string);
            out.push(format!("  {name}: {rendered}"));
        }
    }
    if out.is_empty() {
        out.push("no objects".to_string());
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{render_objects, render_plan};
    use crate::objects::NodeKind;
    use crate::plan::{PendingOperation, PlannedChange};
    use crate::value::Value;

    fn change(name: &str, operation: PendingOperation) -> PlannedChange {
        PlannedChange {
            kind: NodeKind::Address,
            name: Some(name.to_string()),
            xpath: format!("/config/shared/address/entry[@name='{name}']"),
            operation,
        }
    }

    #[test]
    fn plan_hides_noops_unless_verbose() {
        colored::control::set_override(false);
        let planned = [
            change("a", PendingOperation::Create),
            change("b", PendingOperation::NoOp),
        ];
        let quiet = render_plan(&planned, false);
        assert!(quiet.contains("+ create address 'a'"));
        assert!(!quiet.contains("'b'"));
        assert!(quiet.ends_with("create=1 update=0 delete=0 unchanged=1"));
        assert!(render_plan(&planned, true).contains("= unchanged address 'b'"));
    }

    #[test]
    fn objects_show_unset_as_dash() {
        colored::control::set_override(false);
        let mut params = BTreeMap::new();
        params.insert("description".to_string(), None);
        params.insert("value".to_string(), Some(Value::from("10.0.0.1")));
        let out = render_objects(&[("address 'web1'".to_string(), params)]);
        assert_eq!(out, "address 'web1'\n  description: -\n  value: 10.0.0.1");
    }
}
