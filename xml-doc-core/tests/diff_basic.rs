use std::path::PathBuf;

use xml_doc_core::{
    diff, diff_with_options, format_json, format_summary, format_text, parse_file, DiffEntry,
    DiffOptions, XPath,
};

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

const ADDRESSES: &str =
    "/config/devices/entry[@name='localhost.localdomain']/vsys/entry[@name='vsys1']/address";

fn address_container(file: &str) -> xml_doc_core::XmlNode {
    let doc = parse_file(&fixture(file)).expect("parse");
    XPath::parse(ADDRESSES)
        .expect("xpath")
        .select_first(&doc)
        .cloned()
        .expect("address container")
}

#[test]
fn diff_reports_modified_added_and_removed_entries() {
    let current = address_container("fixtures/firewall.xml");
    let desired = address_container("fixtures/firewall-desired.xml");

    let entries = diff(&current, &desired);

    assert!(entries.iter().any(|e| matches!(
        e,
        DiffEntry::Modified { path, .. } if path == "/address/entry[@name='web1']/description"
    )));
    assert!(entries.iter().any(|e| matches!(
        e,
        DiffEntry::Removed { path, .. } if path == "/address/entry[@name='web2']"
    )));
    assert!(entries.iter().any(|e| matches!(
        e,
        DiffEntry::Added { path, .. } if path == "/address/entry[@name='api1']"
    )));

    let text = format_text(&entries);
    let json = format_json(&entries).expect("json");
    let summary = format_summary(&entries);
    assert!(text.contains("~ /address/entry[@name='web1']/description"));
    assert!(json.contains("\"type\": \"added\""));
    assert_eq!(summary, "identical=0 modified=1 added=1 removed=1 structural=0");
}

#[test]
fn ignored_tags_are_skipped() {
    let current = address_container("fixtures/firewall.xml");
    let desired = address_container("fixtures/firewall-desired.xml");

    let opts = DiffOptions {
        ignore_tags: vec!["description".to_string()],
        ..DiffOptions::default()
    };
    let entries = diff_with_options(&current, &desired, &opts);

    assert!(!entries.iter().any(|e| e.path().contains("description")));
}

#[test]
fn identical_rows_are_opt_in() {
    let current = address_container("fixtures/firewall.xml");
    assert!(diff(&current, &current).is_empty());

    let opts = DiffOptions {
        include_identical: true,
        ..DiffOptions::default()
    };
    let entries = diff_with_options(&current, &current, &opts);
    assert!(entries.iter().all(|e| !e.is_change()));
    assert!(entries.iter().any(|e| e.path() == "/address"));
}

#[test]
fn different_roots_are_structural() {
    let current = address_container("fixtures/firewall.xml");
    let other = xml_doc_core::XmlNode::new("service");
    let entries = diff(&current, &other);
    assert!(matches!(&entries[..], [DiffEntry::Structural { .. }]));
}
