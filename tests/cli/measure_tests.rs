use crate::common::{cmd, TestContext};
use predicates::prelude::*;

#[test]
fn test_measure_without_target_fails() {
    cmd()
        .arg("measure")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No target directory"));
}

#[test]
fn test_measure_missing_directory_fails() {
    let ctx = TestContext::new();

    cmd()
        .arg("measure")
        .arg(ctx.path().join("nowhere"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot access target"));
}

#[cfg(unix)]
mod pipeline {
    use super::*;
    use crate::fixtures::{write_calculator, SAMPLE_TRACE};

    const CONFIG: &str = r#"
[pipeline]
build = "true"
run = "sh run.sh"
artifacts = "dist"
"#;

    fn target_with_script(script: &str) -> TestContext {
        let ctx = TestContext::new();
        ctx.write(".joule-trace.toml", CONFIG);
        ctx.write("run.sh", script);
        write_calculator(&ctx.path().join("dist"));
        ctx
    }

    #[test]
    fn test_measure_runs_the_whole_pipeline() {
        let script = format!(
            "test -f \"$JOULE_INSTRUMENTED_DIR/calc.wasm\" || exit 3\ncat > \"$JOULE_TRACE_FILE\" <<'TRACE'\n{}TRACE\n",
            SAMPLE_TRACE
        );
        let ctx = target_with_script(&script);

        cmd()
            .arg("measure")
            .arg(ctx.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("calc$main : 10 uj : 5 uj"));

        let model = std::fs::read_to_string(ctx.path().join(".joule").join("energy.json"))
            .expect("model saved");
        let json: serde_json::Value = serde_json::from_str(&model).unwrap();
        assert_eq!(json["nodes"][0]["identity"]["name"], "main");
        assert!(ctx.path().join(".joule/instrumented/calc.wasm").is_file());
    }

    #[test]
    fn test_measure_detects_missing_trace() {
        let ctx = target_with_script("exit 0\n");
        ctx.write("energy.trace", "calc$main\ncalc$main;1;1\n");

        cmd()
            .arg("measure")
            .arg(ctx.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("did not write a trace"));
        assert!(!ctx.path().join("energy.trace").exists());
    }

    #[test]
    fn test_measure_reports_failing_run() {
        let ctx = target_with_script("exit 7\n");

        cmd()
            .arg("measure")
            .arg(ctx.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("exited with status 7"));
    }

    #[test]
    fn test_measure_keeps_completed_calls_of_a_cut_trace() {
        let script = "cat > \"$JOULE_TRACE_FILE\" <<'TRACE'\ncalc$add\ncalc$add;4;40\ncalc$main\ncalc$pick\nTRACE\n";
        let ctx = target_with_script(script);

        cmd()
            .arg("measure")
            .arg(ctx.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("unterminated"))
            .stderr(predicate::str::contains("Completed calls saved"));

        let model = std::fs::read_to_string(ctx.path().join(".joule").join("energy.json"))
            .expect("partial model saved");
        let json: serde_json::Value = serde_json::from_str(&model).unwrap();
        assert_eq!(json["nodes"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["nodes"][0]["method"], "calc$add");

        cmd()
            .args(["measure", "--allow-partial"])
            .arg(ctx.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("calc$add : 4 uj : 4 uj"))
            .stdout(predicate::str::contains("calc$main").not())
            .stderr(predicate::str::contains("calc$main > calc$pick"));
    }
}
