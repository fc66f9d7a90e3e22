use std::path::PathBuf;

use pretty_assertions::assert_eq;
use xml_doc_core::{parse, parse_file, write, write_compact, write_file};

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

#[test]
fn parse_write_parse_round_trip_preserves_tree_shape() {
    let first = parse_file(&fixture("fixtures/panorama.xml")).expect("initial parse");

    let indented = parse(&write(&first).expect("write")).expect("re-parse indented");
    let compact = parse(&write_compact(&first).expect("write")).expect("re-parse compact");

    assert_eq!(first, indented);
    assert_eq!(first, compact);
}

#[test]
fn parse_and_write_file_round_trip() {
    let out_dir = tempfile::tempdir().expect("tempdir should be created");
    let out_path = out_dir.path().join("roundtrip.xml");

    let node = parse_file(&fixture("fixtures/firewall.xml")).expect("parse");
    write_file(&node, &out_path).expect("write_file");

    let reparsed = parse_file(&out_path).expect("parse_file");
    assert_eq!(node, reparsed);
}
