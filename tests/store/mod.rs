//! Store-level tests: file index + load/save over real files

use std::sync::Arc;

use eridanus_webui::{DocumentStore, FileIndex, PanelError, Resolution};
use serde_json::json;

use crate::common::{TestRun, AI_CHAT_CONFIG};

fn store_for(run: &TestRun) -> DocumentStore {
    DocumentStore::new(Arc::new(FileIndex::build(&run.run_dir())))
}

#[test]
fn test_files_are_named_by_plugin_description() {
    let run = TestRun::new();
    run.add_plugin("ai_chat", "AI Chat")
        .add_file("ai_chat/config.yaml", AI_CHAT_CONFIG)
        .add_file("ai_chat/presets/roles.yaml", "roles: []\n")
        .add_file("no_description/config.yaml", "a: 1\n")
        .add_file("top_level.yaml", "a: 1\n");

    let names: Vec<String> = store_for(&run).files().into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["AI Chat.config", "AI Chat.roles"]);
}

#[test]
fn test_load_then_save_is_byte_identical() {
    let run = TestRun::new();
    run.add_plugin("ai_chat", "AI Chat")
        .add_file("ai_chat/config.yaml", AI_CHAT_CONFIG);
    let store = store_for(&run);

    let snapshot = store.load("AI Chat.config").unwrap();
    let report = store.save("AI Chat.config", &snapshot.data).unwrap();

    assert_eq!(run.read("ai_chat/config.yaml"), AI_CHAT_CONFIG);
    assert!(!report.has_conflicts());
    assert_eq!(report.appended, 0);
}

#[test]
fn test_snapshot_carries_comments_and_order() {
    let run = TestRun::new();
    run.add_plugin("ai_chat", "AI Chat")
        .add_file("ai_chat/config.yaml", AI_CHAT_CONFIG);

    let snapshot = store_for(&run).load("AI Chat.config").unwrap();
    assert_eq!(snapshot.comments.get("model"), Some(&json!("default model")));
    assert_eq!(
        snapshot.order.get(""),
        Some(&json!(["model", "temperature", "api_key", "admins", "proxy"]))
    );
    assert_eq!(snapshot.order.get("admins"), Some(&json!(1)));
    assert_eq!(snapshot.data["api_key"], json!("0000"));
}

#[test]
fn test_save_edit_keeps_layout_and_declared_types() {
    let run = TestRun::new();
    run.add_plugin("ai_chat", "AI Chat")
        .add_file("ai_chat/config.yaml", AI_CHAT_CONFIG);
    let store = store_for(&run);

    let edited = json!({
        "proxy": {"port": 1080, "enabled": true},
        "admins": [10001, "10002", null],
        "api_key": 1234,
        "model": "claude",
        "temperature": 0.2,
        "removed_by_editor": "x"
    });
    let report = store.save("AI Chat.config", &edited).unwrap();

    assert_eq!(
        run.read("ai_chat/config.yaml"),
        "\
# model settings
model: claude # default model
temperature: 0.2
api_key: \"1234\"
admins:
  - 10001
  - 10002
proxy:
  enabled: true
  port: 1080
"
    );
    assert_eq!(report.appended, 1);
    assert_eq!(report.dropped, vec!["removed_by_editor".to_string()]);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].path, "api_key");
    assert_eq!(report.conflicts[0].resolution, Resolution::CoercedToString);
}

#[test]
fn test_type_conflict_keeps_stored_value() {
    let run = TestRun::new();
    run.add_plugin("ai_chat", "AI Chat")
        .add_file("ai_chat/config.yaml", AI_CHAT_CONFIG);
    let store = store_for(&run);

    let report = store
        .save("AI Chat.config", &json!({"proxy": {"enabled": "yes please"}}))
        .unwrap();
    assert!(run.read("ai_chat/config.yaml").contains("  enabled: false\n"));
    assert_eq!(report.conflicts[0].resolution, Resolution::KeptNew);
}

#[test]
fn test_unknown_and_missing_files() {
    let run = TestRun::new();
    run.add_plugin("ai_chat", "AI Chat")
        .add_file("ai_chat/config.yaml", AI_CHAT_CONFIG);
    let store = store_for(&run);

    assert!(matches!(
        store.load("AI Chat.nope"),
        Err(PanelError::UnknownFile { .. })
    ));

    std::fs::remove_file(run.run_dir().join("ai_chat/config.yaml")).unwrap();
    assert!(matches!(
        store.load("AI Chat.config"),
        Err(PanelError::FileNotFound { .. })
    ));
}
