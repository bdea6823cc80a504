//! CLI smoke tests: argument contract, exit status and error surfacing.

mod common;

use std::fs;

use serde_json::Value;

const POLICY: &str = "update_time:\n  base: 10\n  factors:\n    - weight: 1.0\n      range: { low: 0, high: 30 }\npull_count:\n  base: 5\n  factors: []\ntags_count:\n  base: 2\n  factors: []\n";

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: rrp [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
    for command in ["repos-retention", "tags-retention", "policy", "completions"] {
        assert!(
            result.stdout.contains(command),
            "help lacks {command}; log: {}",
            result.log_path.display()
        );
    }
}

#[test]
fn version_command_prints_version() {
    let result = common::run_cli_case("version_command_prints_version", &["--version"]);
    assert!(result.status.success());
    assert!(
        result.stdout.contains(env!("CARGO_PKG_VERSION")),
        "missing version; log: {}",
        result.log_path.display()
    );
}

#[test]
fn tags_retention_without_thresholds_is_rejected() {
    let result = common::run_cli_case("tags_retention_without_thresholds", &["tags-retention"]);
    assert_eq!(result.status.code(), Some(1));
    assert!(
        result.stderr.contains("--day") && result.stderr.contains("--max"),
        "expected missing argument message; log: {}",
        result.log_path.display()
    );
}

#[test]
fn unparsable_day_value_exits_one() {
    let result = common::run_cli_case(
        "unparsable_day_value_exits_one",
        &["tags-retention", "--day", "soon", "--max", "2"],
    );
    assert_eq!(result.status.code(), Some(1));
    assert!(
        result.stderr.contains("--day"),
        "expected invalid value message; log: {}",
        result.log_path.display()
    );
}

#[test]
fn missing_explicit_config_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let result = common::run_cli_case(
        "missing_explicit_config_exits_one",
        &["--config", missing.to_str().unwrap(), "repos-retention"],
    );
    assert_eq!(result.status.code(), Some(1));
    assert!(
        result.stderr.contains("rrp: [RRP-1002]"),
        "expected missing config error; log: {}",
        result.log_path.display()
    );
}

#[test]
fn policy_command_emits_effective_policy_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_config(dir.path(), "http://127.0.0.1:9");
    fs::write(dir.path().join("rp.yaml"), POLICY).unwrap();

    let result = common::run_cli_case(
        "policy_command_emits_effective_policy_as_json",
        &["--config", config.to_str().unwrap(), "--json", "policy"],
    );
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    let payload: Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(payload["command"], "policy");
    assert_eq!(payload["policy"]["update_time"]["base"], 10.0);
    assert_eq!(
        payload["policy"]["update_time"]["factors"][0]["range"]["high"],
        30
    );
}

#[test]
fn empty_policy_bucket_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_config(dir.path(), "http://127.0.0.1:9");
    fs::write(
        dir.path().join("rp.yaml"),
        "pull_count:\n  base: 1\n  factors:\n    - weight: 1.0\n      range: { low: 10, high: 10 }\n",
    )
    .unwrap();

    let result = common::run_cli_case(
        "empty_policy_bucket_is_accepted",
        &["--config", config.to_str().unwrap(), "--json", "policy"],
    );
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    let payload: Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(payload["policy"]["pull_count"]["factors"][0]["range"]["low"], 10);
}

#[test]
fn non_finite_policy_weight_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_config(dir.path(), "http://127.0.0.1:9");
    fs::write(
        dir.path().join("rp.yaml"),
        "pull_count:\n  base: 1\n  factors:\n    - weight: .inf\n      range: { low: 0, high: 10 }\n",
    )
    .unwrap();

    let result = common::run_cli_case(
        "non_finite_policy_weight_exits_one",
        &["--config", config.to_str().unwrap(), "policy"],
    );
    assert_eq!(result.status.code(), Some(1));
    assert!(
        result.stderr.contains("RRP-1004"),
        "expected policy error; log: {}",
        result.log_path.display()
    );
}

#[test]
fn missing_session_store_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_config(dir.path(), "http://127.0.0.1:9");

    let result = common::run_cli_case(
        "missing_session_store_exits_one",
        &[
            "--config",
            config.to_str().unwrap(),
            "tags-retention",
            "--day",
            "30",
            "--max",
            "2",
        ],
    );
    assert_eq!(result.status.code(), Some(1));
    assert!(
        result.stderr.contains("RRP-1005"),
        "expected session error; log: {}",
        result.log_path.display()
    );
}

#[test]
fn unreachable_registry_is_logged_and_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_config(dir.path(), "http://127.0.0.1:9");
    fs::write(dir.path().join("rp.yaml"), POLICY).unwrap();
    fs::write(
        dir.path().join("session.json"),
        r#"{"beegosessionID": "abc123"}"#,
    )
    .unwrap();

    let result = common::run_cli_case_with(
        "unreachable_registry_is_logged_and_exits_one",
        &["--config", config.to_str().unwrap(), "repos-retention"],
        &[],
        "1\ny\n",
    );
    assert_eq!(result.status.code(), Some(1));
    assert!(
        result.stderr.contains("rrp: [RRP-2001]"),
        "expected network error; log: {}",
        result.log_path.display()
    );

    let activity = fs::read_to_string(dir.path().join("activity.jsonl")).unwrap();
    let events: Vec<Value> = activity
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.first().unwrap()["event"], "run_start");
    assert!(events.iter().any(|e| e["event"] == "error" && e["error_code"] == "RRP-2001"));
    let last = events.last().unwrap();
    assert_eq!(last["event"], "run_complete");
    assert_eq!(last["ok"], false);
}

#[test]
fn completions_generate_for_bash() {
    let result = common::run_cli_case("completions_generate_for_bash", &["completions", "bash"]);
    assert!(result.status.success());
    assert!(result.stdout.contains("rrp"));
}
