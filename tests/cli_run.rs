use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

fn unique_log_path(stem: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    std::env::temp_dir().join(format!("infertrace_cli_{stem}_{unique}.jsonl"))
}

fn read_events(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .expect("log readable")
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid JSON line"))
        .collect()
}

fn infertrace() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_infertrace"));
    for key in [
        "INFERTRACE_LOG_LEVEL",
        "INFERTRACE_DETAIL_LEVEL",
        "INFERTRACE_TOKEN_LOG_PATH",
        "INFERTRACE_RESOURCE_LOG_PATH",
        "INFERTRACE_DEVICE_ID",
        "INFERTRACE_DISABLED",
        "RUST_LOG",
    ] {
        command.env_remove(key);
    }
    command
}

#[test]
fn simulated_run_writes_both_logs() {
    let token_log = unique_log_path("tokens");
    let resource_log = unique_log_path("resources");

    let output = infertrace()
        .args(["Hello world!", "--layers", "2", "--max-tokens", "3", "--device", "sim_0"])
        .arg("--token-log")
        .arg(&token_log)
        .arg("--resource-log")
        .arg(&resource_log)
        .output()
        .expect("binary runs");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let tokens = read_events(&token_log);
    assert_eq!(tokens.first().map(|e| &e["event"]), Some(&Value::from("session_start")));
    let end = tokens.last().expect("session end");
    assert_eq!(end["event"], "session_end");
    assert_eq!(end["total_steps"], 6);
    assert_eq!(end["input_token_count"], 3);
    assert_eq!(end["output_token_count"], 3);

    let resources = read_events(&resource_log);
    let allocation = resources
        .iter()
        .find(|e| e["event"] == "memory_allocation")
        .expect("allocation logged");
    assert!(
        allocation["resource_id"]
            .as_str()
            .is_some_and(|id| id.starts_with("sim_0_memory_layer0_attn_qkv_"))
    );
    assert!(resources.iter().any(|e| e["event"] == "resource_session_summary"));
    assert_eq!(resources.last().map(|e| &e["event"]), Some(&Value::from("resource_session_end")));

    std::fs::remove_file(&token_log).expect("token log removable");
    std::fs::remove_file(&resource_log).expect("resource log removable");
}

#[test]
fn disabled_environment_writes_nothing() {
    let token_log = unique_log_path("disabled_tokens");

    let output = infertrace()
        .env("INFERTRACE_DISABLED", "true")
        .arg("--token-log")
        .arg(&token_log)
        .output()
        .expect("binary runs");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("tracing disabled"));
    assert!(!token_log.exists());
}

#[test]
fn invalid_arguments_fail() {
    let output = infertrace().args(["--layers", "0"]).output().expect("binary runs");
    assert!(!output.status.success());

    let output = infertrace()
        .env("INFERTRACE_DETAIL_LEVEL", "loud")
        .output()
        .expect("binary runs");
    assert!(!output.status.success());
}
