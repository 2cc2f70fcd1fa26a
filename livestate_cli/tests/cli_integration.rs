use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Fast machine so full program runs finish in well under a second.
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[sampler]
interval_ms = 1
max_history = 1000

[engine]
poll_ms = 5

[completion]
timeout_ms = 5000
poll_ms = 2

[sim]
feed_rate = 200.0
rapid_rate = 400.0
joints = 3
tools = [
    [1, 1, 6.0],
    { tool_no = 2, pocket_no = 5, diameter = 3.0, z_offset = 12.5, comment = "drill" },
]
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "ok", "stdout")]
#[case(&["run"], 0, "completed 15 of 15 steps", "stdout")]
#[case(&["watch"], 0, "watch complete", "stdout")]
#[case(&["trace"], 0, "trace complete", "stdout")]
#[case(&["tool", "--number", "2"], 0, "diameter 3 z-offset 12.5 drill", "stdout")]
#[case(&["tool", "--number", "9"], 5, "Tool lookup failed", "stderr")]
#[case(&["tool", "--number", "0"], 5, "empty spindle", "stderr")]
#[case(&["run", "--timeout-ms", "1"], 4, "Timed out", "stderr")]
#[case(&["tool"], 2, "required", "stderr")]
#[case(&["trace", "--interval-ms", "0"], 2, "Invalid configuration", "stderr")]
#[case(&["run", "--timeout-ms", "0"], 2, "--timeout-ms must be > 0", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("livestate_cli").unwrap();
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case("self-check")]
#[case("watch")]
#[case("trace")]
fn disconnected_controller_exits_with_connection_code(#[case] sub: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let mut cmd = Command::cargo_bin("livestate_cli").unwrap();
    cmd.env("LIVESTATE_TEST_DISCONNECTED", "1")
        .arg("--config")
        .arg(&cfg)
        .arg(sub);
    cmd.assert()
        .code(3)
        .stderr(predicate::str::contains("Could not reach the controller"));
}

#[rstest]
#[case("[sampler]\ninterval_ms = 0\n", "interval_ms")]
#[case("[sim]\njoints = 99\n", "sim.joints")]
#[case("[logging]\nrotation = \"weekly\"\n", "parsing config")]
#[case("[sim]\ntools = [[1, 1, 6.0], [1, 2, 3.0]]\n", "duplicated")]
fn invalid_config_exits_with_config_code(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, toml).unwrap();
    let mut cmd = Command::cargo_bin("livestate_cli").unwrap();
    cmd.arg("--config").arg(&cfg).arg("self-check");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains(needle));
}

#[rstest]
fn missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("livestate_cli").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("self-check");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("reading config"));
}

#[rstest]
fn defaults_apply_without_config() {
    let mut cmd = Command::cargo_bin("livestate_cli").unwrap();
    cmd.arg("self-check");
    cmd.assert().success().stdout(predicate::str::contains("ok"));
}

#[rstest]
fn loaded_tool_offset_is_removed_from_trace() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let mut cmd = Command::cargo_bin("livestate_cli").unwrap();
    cmd.env("LIVESTATE_TEST_TOOL", "2")
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("trace");
    let out = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8_lossy(&out);
    // The program stays within z 0..=5, so every tip sample sits 12.5 below that.
    let mut zs = Vec::new();
    for line in stdout.lines().filter(|l| l.contains("\"points\"")) {
        let v: serde_json::Value = serde_json::from_str(line).unwrap();
        for p in v["points"].as_array().unwrap() {
            zs.push(p["z"].as_f64().unwrap());
        }
    }
    assert!(!zs.is_empty(), "no trace points; stdout was: {stdout}");
    for z in zs {
        assert!((-12.5 - 1e-9..=-7.5 + 1e-9).contains(&z), "z = {z}");
    }
}
