use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use pretty_assertions::assert_eq;
use predicates::prelude::*;

const MARKER: &str = "# RFC-NOC-COMPLIANCE STANDARDS";

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn ros_migrate() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ros-migrate"));
    cmd.env_remove("RUST_LOG").env("NO_COLOR", "1");
    cmd
}

#[test]
fn compliance_keeps_ports_and_appends_marker_once() {
    ros_migrate()
        .arg("compliance")
        .arg(fixture("fixtures/ccr1072-12g-4s-plus.rsc"))
        .arg("--offline")
        .assert()
        .success()
        .stdout(predicate::str::contains(MARKER).count(1))
        .stdout(predicate::str::contains("default-name=sfp-sfpplus1"))
        .stderr(predicate::str::contains("compliance_summary vendor=RouterOS"));
}

#[test]
fn compliance_twice_is_stable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = dir.path().join("first.rsc");
    let second = dir.path().join("second.rsc");

    ros_migrate()
        .arg("compliance")
        .arg(fixture("fixtures/ccr1072-12g-4s-plus.rsc"))
        .arg("--offline")
        .arg("-o")
        .arg(&first)
        .assert()
        .success();
    ros_migrate()
        .arg("compliance")
        .arg(&first)
        .arg("--offline")
        .arg("-o")
        .arg(&second)
        .assert()
        .success();

    let a = fs::read_to_string(&first).expect("first");
    let b = fs::read_to_string(&second).expect("second");
    assert_eq!(a, b);
}

#[test]
fn tarana_passes_through_byte_for_byte() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("rn.cfg");
    let input = fixture("fixtures/tarana-rn.cfg");

    ros_migrate()
        .arg("compliance")
        .arg(&input)
        .arg("--offline")
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("exempt_passthrough"));

    assert_eq!(fs::read(&out).expect("out"), fs::read(&input).expect("in"));
}

#[test]
fn tarana_translate_is_also_passthrough() {
    let input = fixture("fixtures/tarana-rn.cfg");
    let expected = fs::read_to_string(&input).expect("fixture");
    let output = ros_migrate()
        .arg("translate")
        .arg(&input)
        .args(["--to", "CCR2216-1G-12XS-2XQ", "--firmware", "7.16.2", "--offline"])
        .output()
        .expect("run");
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).expect("utf8"), expected);
}

#[test]
fn inspect_classify_tags_sections() {
    ros_migrate()
        .arg("inspect")
        .arg(fixture("fixtures/ccr1072-12g-4s-plus.rsc"))
        .arg("--classify")
        .arg("--detect")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "vendor=RouterOS model=CCR1072-12G-4S+ firmware=6.49.10 loopback=10.33.0.95",
        ))
        .stdout(predicate::str::contains("/snmp [managed]"))
        .stdout(predicate::str::contains("/system identity [site_specific]"))
        .stdout(predicate::str::contains("managed add address=203.0.113.0/26 list=managerIP"));
}

#[test]
fn profiles_lists_registry() {
    ros_migrate()
        .arg("profiles")
        .assert()
        .success()
        .stdout(predicate::str::contains("profiles source=embedded"))
        .stdout(predicate::str::contains("CCR2216-1G-12XS-2XQ"))
        .stdout(predicate::str::contains("RB5009UG+S+IN"));
}

#[test]
fn profiles_single_model_shows_pools() {
    ros_migrate()
        .args(["profiles", "--model", "ccr2216-1g-12xs-2xq"])
        .assert()
        .success()
        .stdout(predicate::str::contains("count=1"))
        .stdout(predicate::str::contains("sfp28_25g: sfp28-1 sfp28-2"))
        .stdout(predicate::str::contains("reserved olt: sfp28-11 sfp28-12"));
}

#[test]
fn blocks_offline_uses_fallback() {
    ros_migrate()
        .args(["blocks", "--offline", "--loopback-ip", "10.9.9.9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("compliance origin=fallback:"))
        .stdout(predicate::str::contains("[firewall_address_list]"))
        .stdout(predicate::str::contains("src-address=10.9.9.9"));
}

#[test]
fn config_file_can_force_offline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("engine.toml");
    fs::write(&config, "[compliance]\noffline = true\n").expect("write config");

    ros_migrate()
        .arg("--config")
        .arg(&config)
        .arg("blocks")
        .assert()
        .success()
        .stdout(predicate::str::contains("compliance origin=fallback:"))
        .stderr(predicate::str::contains("compliance_fallback").not());
}
