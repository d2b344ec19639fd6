//! End-to-end test of the orchestration tail: a stub engine emits result
//! records into a report folder, which the augmentation pass then stamps
//! with run metadata. No browser is involved; the session lifecycle has its
//! own tests against the driver seam.

use std::fs;
use std::path::Path;

use serde_json::Value;

use webharness::common::config::EngineConfig;
use webharness::engine::{run_engine, EngineInvocation, TagExpression};
use webharness::report::{augment_reports, history_id};

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn engine_output_is_augmented_with_run_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let reports = dir.path().join("reports");
    fs::create_dir_all(&reports).unwrap();

    // Stub engine: writes one result record the way the real formatter would.
    let record = r#"{"name": "Login works", "historyId": "stale", "status": "failed"}"#;
    let script = format!(
        "echo '{}' > {}/a-result.json; exit 1",
        record,
        reports.display()
    );
    let invocation = EngineInvocation {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script],
    };

    let code = run_engine(&invocation, dir.path()).await.unwrap();
    assert_eq!(code, 1, "harness must surface the engine's own exit code");

    let summary = augment_reports(&reports, "Rig-7", "Remotehost").unwrap();
    assert_eq!(summary.updated, 1);
    assert!(summary.is_clean());

    let record = read_json(&reports.join("a-result.json"));
    assert_eq!(record["name"], "Login works -- rig-7 -- remotehost");
    assert_eq!(
        record["historyId"],
        history_id("Login works -- rig-7 -- remotehost").as_str()
    );
    // untouched fields survive the rewrite
    assert_eq!(record["status"], "failed");
}

#[test]
fn composed_arguments_match_the_engine_contract() {
    let engine = EngineConfig::default();
    let tags = TagExpression::parse("@smoke,@fast @regression");
    let invocation = EngineInvocation::compose(
        &engine,
        &["login.feature".into(), "orders.feature".into()],
        Path::new("out/reports"),
        &tags,
        true,
    );

    let line = invocation.args.join(" ");
    assert!(line.starts_with("login.feature orders.feature "));
    assert!(line.contains("-o out/reports"));
    assert!(line.contains("--no-skipped"));
    assert!(line.contains("--verbose"));
    assert!(line.ends_with("--tags=@smoke,@fast --tags=@regression"));
}
