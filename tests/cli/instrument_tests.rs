use crate::common::{cmd, TestContext};
use crate::fixtures::write_calculator;
use predicates::prelude::*;

#[test]
fn test_instrument_then_inspect() {
    let ctx = TestContext::new();
    let input = write_calculator(&ctx.path());
    let out_dir = ctx.path().join("instrumented");

    cmd()
        .arg("instrument")
        .arg(&input)
        .arg("-o")
        .arg(&out_dir)
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "calc: 7 method(s) instrumented, 0 excluded, 0 failed",
        ));

    let instrumented = out_dir.join("calc.wasm");
    assert!(instrumented.is_file());

    let output = cmd()
        .args(["inspect", "--json"])
        .arg(&instrumented)
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["unit"], "calc");
    let keys: Vec<&str> = json["probe_keys"]
        .as_array()
        .expect("probe keys present")
        .iter()
        .filter_map(|k| k.as_str())
        .collect();
    assert_eq!(keys.len(), 7);
    assert!(keys.contains(&"calc$<init>"));
    assert!(keys.contains(&"calc$main"));
}

#[test]
fn test_instrumented_unit_is_not_instrumented_twice() {
    let ctx = TestContext::new();
    let input = write_calculator(&ctx.path());
    let first = ctx.path().join("first");
    let second = ctx.path().join("second");

    cmd()
        .arg("instrument")
        .arg(&input)
        .arg("-o")
        .arg(&first)
        .assert()
        .success();

    cmd()
        .arg("instrument")
        .arg(first.join("calc.wasm"))
        .arg("-o")
        .arg(&second)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already carries energy probes"));
}

#[test]
fn test_exclude_and_json_report() {
    let ctx = TestContext::new();
    write_calculator(&ctx.path().join("units"));
    let report = ctx.path().join("report.json");

    cmd()
        .arg("instrument")
        .arg(ctx.path().join("units"))
        .arg("-o")
        .arg(ctx.path().join("out"))
        .args(["--exclude", "calc$fail", "--report"])
        .arg(&report)
        .assert()
        .success()
        .stderr(predicate::str::contains("6 method(s) instrumented, 1 excluded"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json[0]["excluded"][0], "calc$fail");
}

#[test]
fn test_inspect_plain_unit() {
    let ctx = TestContext::new();
    let input = write_calculator(&ctx.path());

    cmd()
        .arg("inspect")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("calc$dispatch (i32)->"))
        .stdout(predicate::str::contains("Probe keys").not());
}

#[test]
fn test_missing_input_fails() {
    let ctx = TestContext::new();

    cmd()
        .arg("instrument")
        .arg(ctx.path().join("missing.wasm"))
        .arg("-o")
        .arg(ctx.path().join("out"))
        .assert()
        .failure();
}
