use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

#[test]
fn show_detects_firewall_snapshot() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fwcfg-sync"));
    cmd.arg("show")
        .arg(fixture("fixtures/firewall.xml"))
        .arg("--detect")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "type=firewall version=10.1.0 version_source=config@version version_confidence=high",
        ))
        .stdout(predicate::str::contains("entry[localhost.localdomain]"));
}

#[test]
fn show_detects_panorama_snapshot() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fwcfg-sync"));
    cmd.arg("show")
        .arg(fixture("fixtures/panorama.xml"))
        .arg("--detect")
        .arg("--depth")
        .arg("1")
        .assert()
        .success()
        .stdout(predicate::str::contains("type=panorama version=10.2.0"))
        .stdout(predicate::str::contains("... 1 more"));
}

#[test]
fn show_renders_subtree_at_xpath() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fwcfg-sync"));
    cmd.arg("show")
        .arg(fixture("fixtures/firewall.xml"))
        .arg("--xpath")
        .arg("/config/devices/entry[@name='localhost.localdomain']/vsys/entry[@name='vsys1']/address")
        .arg("--depth")
        .arg("2")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("address\n"))
        .stdout(predicate::str::contains("  entry[web1]"))
        .stdout(predicate::str::contains("    ip-netmask: 10.1.1.10"))
        .stdout(predicate::str::contains("    fqdn: mirror.example.net"));
}

#[test]
fn show_fails_for_missing_xpath_target() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fwcfg-sync"));
    cmd.arg("show")
        .arg(fixture("fixtures/firewall.xml"))
        .arg("--xpath")
        .arg("/config/mgt-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing at '/config/mgt-config'"));
}
