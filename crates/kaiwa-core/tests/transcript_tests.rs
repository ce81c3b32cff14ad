mod common;

use chrono::{Local, TimeZone};
use common::ScriptedClient;
use kaiwa_core::constants::transcripts::{EMPTY_CHAT_TITLE, FALLBACK_TITLE};
use kaiwa_core::transcript::list_transcripts;
use kaiwa_core::*;
use regex::Regex;
use std::fs::File;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn titler(client: ScriptedClient) -> (Arc<ScriptedClient>, Titler) {
    let client = Arc::new(client);
    let titler = Titler::new(client.clone());
    (client, titler)
}

fn set_mtime(path: &std::path::Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

// ========================================================================
// Save
// ========================================================================

#[tokio::test]
async fn test_save_single_message_scenario() {
    let dir = TempDir::new().unwrap();
    let store = TranscriptStore::new(dir.path());
    let (_, titler) = titler(ScriptedClient::new());

    let history = vec![Message::user("Hello")];
    let saved = store.save(&history, &titler).await.unwrap();

    let pattern = Regex::new(r"^\d{8}_\d{6}_.+\.json$").unwrap();
    assert!(pattern.is_match(&saved.file_name), "{}", saved.file_name);
    assert!(saved.file_name.ends_with("_Greeting.json"));
    assert!(saved.path.exists());
    assert!(saved.to_string().contains(&saved.path.display().to_string()));

    let raw = std::fs::read_to_string(&saved.path).unwrap();
    let decoded: Vec<Message> = serde_json::from_str(&raw).unwrap();
    assert_eq!(decoded, history);
}

#[tokio::test]
async fn test_save_load_roundtrip_non_ascii() {
    let dir = TempDir::new().unwrap();
    let store = TranscriptStore::new(dir.path());
    let (_, titler) = titler(ScriptedClient::new().with_title("挨拶"));

    let history = vec![
        Message::system("コンテキスト"),
        Message::user("こんにちは 👋"),
        Message::assistant("Grüße, \"quoted\" and\nmultiline"),
        Message::user(""),
    ];
    let saved = store.save(&history, &titler).await.unwrap();

    let raw = std::fs::read_to_string(&saved.path).unwrap();
    assert!(raw.contains("こんにちは 👋"), "non-ASCII must be written verbatim");
    assert!(!raw.contains("\\u"));
    assert!(raw.contains("\n    {\n        \"role\""));

    assert_eq!(store.load(&saved.file_name), history);
    assert_eq!(saved.title, "挨拶");
}

#[tokio::test]
async fn test_save_empty_history_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let save_dir = dir.path().join("chats");
    let store = TranscriptStore::new(&save_dir);
    let (client, titler) = titler(ScriptedClient::new());

    let err = store.save(&[], &titler).await.unwrap_err();

    assert!(matches!(err, KaiwaError::EmptyHistory));
    assert!(!save_dir.exists());
    assert_eq!(client.chat_count(), 0);
}

#[tokio::test]
async fn test_save_uses_fallback_when_titler_fails() {
    let dir = TempDir::new().unwrap();
    let store = TranscriptStore::new(dir.path());
    let (_, titler) = titler(ScriptedClient::new().with_failing_title("401 Unauthorized"));

    let saved = store
        .save(&[Message::user("Hello")], &titler)
        .await
        .unwrap();

    assert_eq!(saved.title, FALLBACK_TITLE);
    assert!(saved.file_name.ends_with(&format!("_{FALLBACK_TITLE}.json")));
}

#[tokio::test]
async fn test_save_titles_from_first_three_messages() {
    let dir = TempDir::new().unwrap();
    let store = TranscriptStore::new(dir.path());
    let (client, titler) = titler(ScriptedClient::new());

    let history: Vec<Message> = (0..6)
        .map(|i| {
            if i % 2 == 0 {
                Message::user(format!("質問 {i}"))
            } else {
                Message::assistant(format!("answer {i}"))
            }
        })
        .collect();
    store.save(&history, &titler).await.unwrap();

    let chats = client.chats.lock().unwrap();
    let (_, messages) = &chats[0];
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    let sent: Vec<Message> = serde_json::from_str(&messages[1].content).unwrap();
    assert_eq!(sent, history[..3].to_vec());
    assert!(messages[1].content.contains("質問 0"));
}

#[tokio::test]
async fn test_title_request_clips_attached_document() {
    let dir = TempDir::new().unwrap();
    let store = TranscriptStore::new(dir.path());
    let (client, titler) = titler(ScriptedClient::new());

    let mut session = Session::new();
    session.set_context("x".repeat(50_000));
    session.add_user_message("Summarize the file");
    store.save(session.messages(), &titler).await.unwrap();

    let chats = client.chats.lock().unwrap();
    let sent: Vec<Message> = serde_json::from_str(&chats[0].1[1].content).unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].role, Role::System);
    assert_eq!(sent[0].content.chars().count(), 500);
    assert_eq!(sent[1], Message::user("Summarize the file"));
}

#[test]
fn test_save_never_overwrites() {
    let dir = TempDir::new().unwrap();
    let store = TranscriptStore::new(dir.path());
    let now = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

    let first = store
        .save_with_title(&[Message::user("one")], "Same", now)
        .unwrap();
    let second = store
        .save_with_title(&[Message::user("two")], "Same", now)
        .unwrap();

    assert_eq!(first.file_name, "20250102_030405_Same.json");
    assert_eq!(second.file_name, "20250102_030405_Same_2.json");
    assert_eq!(store.load(&first.file_name), vec![Message::user("one")]);
    assert_eq!(store.load(&second.file_name), vec![Message::user("two")]);
}

#[test]
fn test_save_reports_persistence_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "occupied").unwrap();
    let store = TranscriptStore::new(&blocker);

    let err = store
        .save_with_title(&[Message::user("hi")], "t", Local::now())
        .unwrap_err();

    assert!(matches!(err, KaiwaError::Persistence { .. }));
    assert!(err.is_recoverable());
}

// ========================================================================
// Titler
// ========================================================================

#[tokio::test]
async fn test_titler_sanitizes_model_output() {
    let (_, titler) = titler(ScriptedClient::new().with_title("\"Trip: Kyoto/Osaka!\"\n"));
    assert_eq!(titler.title(&[Message::user("plan")]).await, "Trip KyotoOsaka");
}

#[tokio::test]
async fn test_titler_unusable_output_falls_back() {
    let (_, titler) = titler(ScriptedClient::new().with_title("?!."));
    assert_eq!(titler.title(&[Message::user("x")]).await, FALLBACK_TITLE);
}

#[tokio::test]
async fn test_titler_empty_prefix_skips_model() {
    let (client, titler) = titler(ScriptedClient::new());
    assert_eq!(titler.title(&[]).await, EMPTY_CHAT_TITLE);
    assert_eq!(client.chat_count(), 0);
}

#[tokio::test]
async fn test_titler_uses_configured_model() {
    let client = Arc::new(ScriptedClient::new());
    let titler = Titler::new(client.clone()).with_model("title-model");
    titler.title(&[Message::user("x")]).await;
    assert_eq!(client.chats.lock().unwrap()[0].0, "title-model");
}

// ========================================================================
// List
// ========================================================================

#[test]
fn test_list_most_recent_first() {
    let dir = TempDir::new().unwrap();
    let base = SystemTime::now() - Duration::from_secs(3600);
    for (name, offset) in [("a_old.json", 0), ("b_new.json", 200), ("c_mid.json", 100)] {
        let path = dir.path().join(name);
        std::fs::write(&path, "[]").unwrap();
        set_mtime(&path, base + Duration::from_secs(offset));
    }
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    std::fs::create_dir(dir.path().join("folder.json")).unwrap();

    assert_eq!(
        list_transcripts(dir.path()),
        vec!["b_new.json", "c_mid.json", "a_old.json"]
    );
}

#[test]
fn test_list_ties_break_by_name() {
    let dir = TempDir::new().unwrap();
    let time = SystemTime::now() - Duration::from_secs(60);
    for name in ["zeta.json", "alpha.json", "mid.json"] {
        let path = dir.path().join(name);
        std::fs::write(&path, "[]").unwrap();
        set_mtime(&path, time);
    }

    let store = TranscriptStore::new(dir.path());
    assert_eq!(store.list(), vec!["alpha.json", "mid.json", "zeta.json"]);
}

#[test]
fn test_list_missing_directory_is_empty() {
    let dir = TempDir::new().unwrap();
    assert!(list_transcripts(&dir.path().join("first-run")).is_empty());
}

// ========================================================================
// Load
// ========================================================================

#[test]
fn test_load_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = TranscriptStore::new(dir.path());

    assert!(store.load("nope.json").is_empty());
    assert!(matches!(
        store.try_load("nope.json"),
        Err(KaiwaError::Deserialization { .. })
    ));
}

#[test]
fn test_load_malformed_file_is_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
    std::fs::write(
        dir.path().join("bad_role.json"),
        r#"[{"role": "tool", "content": "x"}]"#,
    )
    .unwrap();
    let store = TranscriptStore::new(dir.path());

    assert!(store.load("broken.json").is_empty());
    assert!(store.load("bad_role.json").is_empty());
}

#[test]
fn test_load_by_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("elsewhere.json");
    std::fs::write(&path, r#"[{"role": "user", "content": "hi"}]"#).unwrap();

    let store = TranscriptStore::new("/definitely/not/here");
    assert_eq!(
        store.load(path.to_str().unwrap()),
        vec![Message::user("hi")]
    );
}

#[tokio::test]
async fn test_loaded_history_replaces_session() {
    let dir = TempDir::new().unwrap();
    let store = TranscriptStore::new(dir.path());
    let (_, titler) = titler(ScriptedClient::new());
    let saved = store
        .save(&[Message::user("saved"), Message::assistant("reply")], &titler)
        .await
        .unwrap();

    let mut session = Session::new();
    session.add_user_message("current");
    session.replace(store.load(&saved.file_name));

    assert_eq!(session.len(), 2);
    assert_eq!(session.messages()[0].content, "saved");
}
