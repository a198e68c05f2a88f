use crate::common::{cmd, TestContext};
use crate::fixtures::SAMPLE_TRACE;
use predicates::prelude::*;

#[test]
fn test_tree_output() {
    let ctx = TestContext::new();
    let trace = ctx.write("energy.trace", SAMPLE_TRACE);

    cmd()
        .arg("analyze")
        .arg(&trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("calc$main : 10 uj : 5 uj"))
        .stdout(predicate::str::contains("|-- calc$add : 2 uj : 2 uj"))
        .stdout(predicate::str::contains("`-- calc$pick : 3 uj : 3 uj"));
}

#[test]
fn test_duration_tree() {
    let ctx = TestContext::new();
    let trace = ctx.write("energy.trace", SAMPLE_TRACE);

    cmd()
        .args(["analyze", "--quantity", "duration"])
        .arg(&trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("calc$main : 1000 ns : 500 ns"));
}

#[test]
fn test_json_output_is_valid() {
    let ctx = TestContext::new();
    let trace = ctx.write("energy.trace", SAMPLE_TRACE);

    let output = cmd()
        .args(["analyze", "--format", "json"])
        .arg(&trace)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["roots"], serde_json::json!([0]));
    let root = &json["nodes"][0];
    assert_eq!(root["method"], "calc$main");
    assert_eq!(root["energy"], 10.0);
    assert_eq!(root["children"], serde_json::json!([1, 2]));
    assert_eq!(json["nodes"][2]["parent"], 0);
    assert_eq!(json["measures"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_collapsed_output() {
    let ctx = TestContext::new();
    let trace = ctx.write("energy.trace", SAMPLE_TRACE);

    cmd()
        .args(["analyze", "--format", "collapsed"])
        .arg(&trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("calc$main 5\n"))
        .stdout(predicate::str::contains("calc$main;calc$add 2\n"))
        .stdout(predicate::str::contains("calc$main;calc$pick 3\n"));
}

#[test]
fn test_summary_to_file() {
    let ctx = TestContext::new();
    let trace = ctx.write("energy.trace", SAMPLE_TRACE);
    let report = ctx.path().join("summary.txt");

    cmd()
        .args(["analyze", "--format", "summary", "-o"])
        .arg(&report)
        .arg(&trace)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let text = std::fs::read_to_string(&report).unwrap();
    assert!(text.contains("calc$main"));
    assert!(text.contains("3 invocation(s)"));
}

#[test]
fn test_exit_without_enter_fails() {
    let ctx = TestContext::new();
    let trace = ctx.write("bad.trace", "calc$main;1;1\n");

    cmd()
        .arg("analyze")
        .arg(&trace)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no open call"));
}

#[test]
fn test_malformed_record_reports_line() {
    let ctx = TestContext::new();
    let trace = ctx.write("bad.trace", "calc$main\ncalc$main;x;1\n");

    cmd()
        .arg("analyze")
        .arg(&trace)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_truncated_trace_needs_allow_partial() {
    let ctx = TestContext::new();
    let trace = ctx.write(
        "cut.trace",
        "calc$add\ncalc$add;4;40\ncalc$main\ncalc$pick\n",
    );

    cmd()
        .arg("analyze")
        .arg(&trace)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unterminated"));

    cmd()
        .args(["analyze", "--allow-partial"])
        .arg(&trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("calc$add : 4 uj : 4 uj"))
        .stdout(predicate::str::contains("calc$main").not())
        .stderr(predicate::str::contains("calc$main > calc$pick"));
}

#[test]
fn test_exclude_drops_subtree() {
    let ctx = TestContext::new();
    let trace = ctx.write("energy.trace", SAMPLE_TRACE);

    cmd()
        .args(["analyze", "--exclude", "calc$pick"])
        .arg(&trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("calc$add"))
        .stdout(predicate::str::contains("calc$pick").not());
}

#[test]
fn test_inconsistent_readings_are_warned_about() {
    let ctx = TestContext::new();
    let trace = ctx.write("odd.trace", "calc$main\ncalc$add\ncalc$add;8;10\ncalc$main;5;100\n");

    cmd()
        .arg("analyze")
        .arg(&trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("calc$main : 5 uj : -3 uj"))
        .stderr(predicate::str::contains("< callees 8 uj"));
}
