use std::path::PathBuf;

use xml_doc_core::{parse, parse_file};

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

#[test]
fn parses_device_snapshot_structure() {
    let node = parse_file(&fixture("fixtures/firewall.xml")).expect("parse should succeed");
    assert_eq!(node.tag, "config");
    assert_eq!(node.attributes.get("version"), Some(&"10.1.0".to_string()));

    let device = node
        .descend(&["devices", "entry"])
        .expect("device entry should exist");
    assert_eq!(device.name(), Some("localhost.localdomain"));

    let addresses = device
        .descend(&["vsys", "entry", "address"])
        .expect("address container should exist");
    let names: Vec<_> = addresses
        .get_children("entry")
        .iter()
        .filter_map(|e| e.name())
        .collect();
    assert_eq!(names, vec!["web1", "web2", "mirror"]);
}

#[test]
fn whitespace_between_elements_is_not_text() {
    let node = parse(b"<a>\n  <b>x</b>\n</a>").expect("parse");
    assert_eq!(node.text, None);
    assert_eq!(node.get_text(&["b"]), Some("x"));
}

#[test]
fn entities_are_unescaped() {
    let node = parse(br#"<entry name="a&amp;b"><description>1 &lt; 2</description></entry>"#)
        .expect("parse");
    assert_eq!(node.name(), Some("a&b"));
    assert_eq!(node.get_text(&["description"]), Some("1 < 2"));
}

#[test]
fn leaf_whitespace_is_content() {
    let xml = "<entry><description>  </description><comment> padded </comment><tag>\n  </tag></entry>";
    let node = parse(xml.as_bytes()).expect("parse");
    assert_eq!(node.get_text(&["description"]), Some("  "));
    assert_eq!(node.get_text(&["comment"]), Some(" padded "));
    assert_eq!(node.get_text(&["tag"]), None);
}
