use std::path::PathBuf;

use pretty_assertions::assert_eq;
use xml_doc_core::{parse_file, XPath, XmlNode};

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

#[test]
fn selects_named_entry_in_snapshot() {
    let doc = parse_file(&fixture("fixtures/firewall.xml")).expect("parse");
    let path = XPath::parse(
        "/config/devices/entry[@name='localhost.localdomain']/vsys/entry[@name='vsys1']/address/entry[@name='web1']",
    )
    .expect("xpath");

    let entry = path.select_first(&doc).expect("web1");
    assert_eq!(entry.get_text(&["ip-netmask"]), Some("10.1.1.10"));
}

#[test]
fn wrong_root_selects_nothing() {
    let doc = parse_file(&fixture("fixtures/firewall.xml")).expect("parse");
    let path = XPath::parse("/response/result").expect("xpath");
    assert!(path.select(&doc).is_empty());
}

#[test]
fn remove_all_detaches_every_match() {
    let mut doc = parse_file(&fixture("fixtures/firewall.xml")).expect("parse");
    let path = XPath::parse(
        "/config/devices/entry[@name='localhost.localdomain']/vsys/entry[@name='vsys1']/address/entry[@name='web1' or @name='mirror']",
    )
    .expect("xpath");

    let removed = path.remove_all(&mut doc);
    let names: Vec<_> = removed.iter().filter_map(XmlNode::name).collect();
    assert_eq!(names, vec!["web1", "mirror"]);
    assert!(path.select(&doc).is_empty());

    let container = path.parent().expect("parent").select_first(&doc).expect("container");
    assert_eq!(container.get_children("entry").len(), 1);
}

#[test]
fn parent_and_join_rebuild_the_same_address() {
    let raw = "/config/shared/address/entry[@name='dns-a']";
    let path = XPath::parse(raw).expect("xpath");
    let last = path.last().cloned().expect("last");
    let rebuilt = path.parent().expect("parent").join(last);
    assert_eq!(rebuilt.to_string(), raw);
}
