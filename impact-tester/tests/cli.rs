use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "impact-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_impact-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("distribution"));
}

#[test]
fn cli_runs_all_scenarios_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_impact-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--scenarios",
            "all",
            "--iterations",
            "2",
            "--seeds",
            "1,42",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Impact Science Tester"));

    let content = std::fs::read_to_string(output_path).expect("read output");
    let results: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let runs = results.as_array().expect("array of results");
    assert_eq!(runs.len(), 10);
    assert!(runs.iter().all(|run| run["passed"] == true));
}

#[test]
fn cli_rejects_unparseable_seeds() {
    let exe = env!("CARGO_BIN_EXE_impact-tester");
    let output = Command::new(exe)
        .args(["--seeds", "not-a-seed"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized seed token"));
}

#[test]
fn cli_unknown_scenario_warns_and_succeeds() {
    let exe = env!("CARGO_BIN_EXE_impact-tester");
    let output = Command::new(exe)
        .args(["--scenarios", "vehicle-system", "--report", "markdown"])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stderr.contains("Unknown scenario"));
    assert!(stdout.contains("No scenarios executed"));
}
