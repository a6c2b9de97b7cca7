//! End-to-end tests of the eridanus-webui binary

use serde_json::{json, Value};

use crate::common::{TestRun, AI_CHAT_CONFIG};

fn fixture() -> TestRun {
    let run = TestRun::new();
    run.add_plugin("ai_chat", "AI Chat")
        .add_file("ai_chat/config.yaml", AI_CHAT_CONFIG);
    run
}

#[test]
fn test_files_json() {
    let run = fixture();
    let stdout = run.run_cli_success(&["--format", "json", "files"]);
    let value: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["count"], json!(1));
    assert_eq!(value["files"][0]["name"], json!("AI Chat.config"));
}

#[test]
fn test_load_json_snapshot() {
    let run = fixture();
    let stdout = run.run_cli_success(&["--format", "json", "load", "AI Chat.config"]);
    let value: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["data"]["proxy"]["port"], json!(7890));
    assert_eq!(value["comments"]["model"], json!("default model"));
}

#[test]
fn test_load_text_lists_values_with_comments() {
    let run = fixture();
    let stdout = run.run_cli_success(&["load", "AI Chat.config"]);
    assert!(stdout.contains("model = \"gpt\"  # default model\n"), "{}", stdout);
    assert!(stdout.contains("proxy.port = 7890\n"), "{}", stdout);
}

#[test]
fn test_save_from_input_file() {
    let run = fixture();
    let input = run.add_root_file("edit.json", r#"{"proxy": {"port": 1080}}"#);
    let stdout = run.run_cli_success(&["save", "AI Chat.config", "--input", input.to_str().unwrap()]);
    assert!(stdout.starts_with("saved: AI Chat.config\n"), "{}", stdout);
    assert!(run.read("ai_chat/config.yaml").contains("  port: 1080\n"));
    assert!(run.read("ai_chat/config.yaml").starts_with("# model settings\n"));
}

#[test]
fn test_save_dry_run_leaves_file_alone() {
    let run = fixture();
    let input = run.add_root_file("edit.json", r#"{"model": "other"}"#);
    let stdout = run.run_cli_success(&[
        "save",
        "AI Chat.config",
        "--input",
        input.to_str().unwrap(),
        "--dry-run",
    ]);
    assert!(stdout.contains("model: other # default model\n"), "{}", stdout);
    assert_eq!(run.read("ai_chat/config.yaml"), AI_CHAT_CONFIG);
}

#[test]
fn test_save_by_file_path() {
    let run = fixture();
    let input = run.add_root_file("edit.json", r#"{"temperature": 1.5}"#);
    let target = run.run_dir().join("ai_chat/config.yaml");
    run.run_cli_success(&[
        "save",
        "--file",
        target.to_str().unwrap(),
        "--input",
        input.to_str().unwrap(),
    ]);
    assert!(run.read("ai_chat/config.yaml").contains("temperature: 1.5\n"));
}

#[test]
fn test_unknown_name_exit_code_and_payload() {
    let run = fixture();
    let output = run.run_cli(&["--format", "json", "load", "Nope.config"]);
    assert_eq!(output.status.code(), Some(2));
    let payload: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["code"], json!("invalid_file_name"));
}

#[test]
fn test_invalid_edit_json_is_rejected() {
    let run = fixture();
    let input = run.add_root_file("edit.json", "{broken");
    let output = run.run_cli(&["save", "AI Chat.config", "--input", input.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(run.read("ai_chat/config.yaml"), AI_CHAT_CONFIG);
}

#[test]
fn test_config_set_and_get() {
    let run = fixture();
    run.run_cli_success(&["config", "set", "relay.identity.group_id", "42"]);
    let stdout = run.run_cli_success(&["config", "get", "relay.identity.group_id"]);
    assert_eq!(stdout, "42\n");
    assert!(run.config_path().exists());
}
