//! End-to-end tests driving the `boris` binary.
//!
//! Tests the full pipeline: code events → check → states → kappa
//! against project files in a temporary directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const PROJECT: &str = r#"{
    "name": "e2e",
    "ethogram": {
        "walk": {"type": "state", "excluded": ["rest"]},
        "rest": {"type": "state"},
        "bark": {"type": "point"}
    },
    "observations": {
        "alice": {"type": "LIVE", "events": []},
        "bob": {"type": "LIVE", "events": []}
    }
}"#;

fn boris_binary() -> String {
    env!("CARGO_BIN_EXE_boris").to_string()
}

/// Writes the sample project into `temp` and returns its path.
fn write_project(temp: &Path) -> PathBuf {
    let path = temp.join("project.json");
    std::fs::write(&path, PROJECT).unwrap();
    path
}

/// Runs boris with an isolated config directory.
fn boris(temp: &Path, args: &[&str]) -> Output {
    Command::new(boris_binary())
        .env("HOME", temp)
        .env("XDG_CONFIG_HOME", temp.join(".config"))
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run boris")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "boris should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn code(temp: &Path, project: &Path, observation: &str, time: &str, behavior: &str) -> Output {
    let project = project.to_str().unwrap();
    let output = boris(
        temp,
        &["code", project, "-o", observation, "-t", time, "-b", behavior],
    );
    assert_success(&output);
    output
}

/// Coding an excluding state stops the running one just before it.
#[test]
fn test_code_synthesizes_exclusion_stop() {
    let temp = TempDir::new().unwrap();
    let project = write_project(temp.path());

    code(temp.path(), &project, "alice", "0", "rest");
    let output = code(temp.path(), &project, "alice", "10", "walk");
    assert_eq!(
        stdout(&output),
        "alice: recorded START walk at 00:00:10.000\nalice: stopped 1 state(s)\n"
    );

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&project).unwrap()).unwrap();
    let events = saved["observations"]["alice"]["events"].as_array().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[1], serde_json::json!([9.999, "", "rest", "", ""]));
    assert_eq!(saved["name"], "e2e", "unknown keys should survive a save");

    let output = boris(
        temp.path(),
        &["states", project.to_str().unwrap(), "-o", "alice", "-t", "5"],
    );
    assert_success(&output);
    assert_eq!(
        stdout(&output),
        "Active states at 00:00:05.000\nNo focal subject: rest\n"
    );
}

/// A rejected event leaves the project file untouched and exits non-zero.
#[test]
fn test_duplicate_event_is_rejected() {
    let temp = TempDir::new().unwrap();
    let project = write_project(temp.path());
    code(temp.path(), &project, "alice", "3", "bark");
    let before = std::fs::read_to_string(&project).unwrap();

    let output = boris(
        temp.path(),
        &["code", project.to_str().unwrap(), "-o", "alice", "-t", "3", "-b", "bark"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already coded"));
    assert_eq!(std::fs::read_to_string(&project).unwrap(), before);
}

/// Check lists unpaired states; fix closes them.
#[test]
fn test_check_and_fix_unpaired_states() {
    let temp = TempDir::new().unwrap();
    let project = write_project(temp.path());
    let path = project.to_str().unwrap();
    code(temp.path(), &project, "bob", "2", "walk");

    let output = boris(temp.path(), &["check", path, "-o", "bob"]);
    assert_success(&output);
    assert_eq!(
        stdout(&output),
        "bob: 1 unpaired state(s)\n  row 0: No focal subject walk started at 00:00:02.000\n"
    );

    let output = boris(temp.path(), &["fix", path, "-o", "bob", "-t", "00:00:30"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "bob: closed 1 unpaired state(s)\n");

    let output = boris(temp.path(), &["check", path]);
    assert_success(&output);
    assert_eq!(stdout(&output), "alice: ok\nbob: ok\n");
}

/// Two observers coding the same walk agree perfectly.
#[test]
fn test_kappa_between_observers() {
    let temp = TempDir::new().unwrap();
    let project = write_project(temp.path());
    for observation in ["alice", "bob"] {
        code(temp.path(), &project, observation, "0", "walk");
        code(temp.path(), &project, observation, "5", "walk");
    }

    let output = boris(
        temp.path(),
        &["kappa", project.to_str().unwrap(), "--weighted", "--json"],
    );
    assert_success(&output);
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["method"], "time_weighted");
    assert_eq!(json["observations"], serde_json::json!(["alice", "bob"]));
    assert_eq!(json["kappa"][0][1], 1.0);
    assert!(json["warnings"].as_array().unwrap().is_empty());
}

/// Configuration from a file feeds the timeline policy.
#[test]
fn test_config_file_sets_stop_offset() {
    let temp = TempDir::new().unwrap();
    let project = write_project(temp.path());
    let config = temp.path().join("boris.toml");
    std::fs::write(&config, "stop_offset = \"0.5\"\n").unwrap();
    let path = project.to_str().unwrap();
    let config = config.to_str().unwrap();

    for (time, behavior) in [("0", "rest"), ("10", "walk")] {
        let output = boris(
            temp.path(),
            &["--config", config, "code", path, "-o", "alice", "-t", time, "-b", behavior],
        );
        assert_success(&output);
    }

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&project).unwrap()).unwrap();
    assert_eq!(saved["observations"]["alice"]["events"][1][0], 9.5);
}
