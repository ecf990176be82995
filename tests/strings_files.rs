use assert_fs::TempDir;
use assert_fs::fixture::ChildPath;
use assert_fs::prelude::*;
use async_trait::async_trait;
use std::sync::Arc;

use vtu_translate::config::ProviderKind;
use vtu_translate::error::{Result, TranslateError};
use vtu_translate::progress::{LogSink, LogType};
use vtu_translate::resource::ResourceStore;
use vtu_translate::scheduler::BatchScheduler;
use vtu_translate::session::Session;
use vtu_translate::strings_xml::{read_strings_file, save_translated_file};
use vtu_translate::translate::TranslationBackend;

const STRINGS_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <string name="app_name">Notes</string>
    <string name="build_id" translatable="false">2024.1</string>
    <string name="welcome">Welcome, %1$s!</string>
    <string name="version">1.2.3</string>
    <string name="homepage">https://example.com/notes</string>
    <string name="accent">#FF5722</string>
    <string name="delete_confirm">Delete "%s"? It can't be undone.</string>
</resources>
"#;

/// Wraps every text in brackets
struct BracketBackend;

#[async_trait]
impl TranslationBackend for BracketBackend {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Cerebras
    }

    fn model(&self) -> String {
        "brackets".to_string()
    }

    async fn translate_batch(&self, texts: &[String], _target_language: &str) -> Result<Vec<String>> {
        Ok(texts.iter().map(|t| format!("[{}]", t)).collect())
    }

    async fn fetch_available_models(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn translate_file_end_to_end() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("res/values/strings.xml");
    input.write_str(STRINGS_XML).unwrap();

    let parsed = read_strings_file(input.path()).unwrap();
    assert_eq!(parsed.resources.len(), 6);
    assert_eq!(parsed.non_translatable, 1);
    assert_eq!(parsed.technical, 3);
    assert_eq!(parsed.pending(), 3);

    let store = ResourceStore::with_resources(parsed.resources);
    let log = LogSink::new();
    let scheduler = BatchScheduler::new(Arc::new(BracketBackend), store.clone(), log.clone());
    scheduler.translate_all("ja", 5, 10).await.unwrap();
    assert_eq!(log.count(LogType::Success), 3);

    let out_root = temp.child("out");
    let path = save_translated_file(out_root.path(), "ja", &store.snapshot(), &log)
        .await
        .unwrap();

    assert_eq!(path, out_root.path().join("res/values-ja/strings.xml"));
    let written = temp.child("out/res/values-ja/strings.xml");
    let content = read(&written);
    assert!(content.contains("<string name=\"app_name\">[Notes]</string>"));
    assert!(content.contains("<string name=\"version\">1.2.3</string>"));
    assert!(content.contains("[Welcome, %1$s!]"));
    assert!(content.contains("[Delete \"%s\"? It can't be undone.]"));
    assert!(!content.contains("build_id"));
    assert!(log.entries().last().unwrap().message.starts_with("Saved file to"));

    // the written file parses back with the translated values
    let reparsed = read_strings_file(written.path()).unwrap();
    assert_eq!(reparsed.resources.len(), 6);
}

fn read(file: &ChildPath) -> String {
    std::fs::read_to_string(file.path()).unwrap()
}

#[tokio::test]
async fn english_goes_to_default_values_folder() {
    let temp = TempDir::new().unwrap();
    let parsed = vtu_translate::strings_xml::parse_strings_xml(STRINGS_XML.as_bytes()).unwrap();
    let log = LogSink::new();

    let path = save_translated_file(temp.path(), "en", &parsed.resources, &log)
        .await
        .unwrap();
    assert_eq!(path, temp.path().join("res/values/strings.xml"));
    assert!(read(&temp.child("res/values/strings.xml")).contains("Notes"));
}

#[tokio::test]
async fn saving_nothing_is_logged_as_error() {
    let temp = TempDir::new().unwrap();
    let log = LogSink::new();

    let result = save_translated_file(temp.path(), "vi", &[], &log).await;
    assert!(matches!(result, Err(TranslateError::InvalidResource(_))));
    assert_eq!(log.count(LogType::Error), 1);
}

#[test]
fn missing_input_file_is_reported() {
    let temp = TempDir::new().unwrap();
    let result = read_strings_file(temp.path().join("nope.xml"));
    assert!(matches!(result, Err(TranslateError::FileNotFound(_))));
}

#[test]
fn session_survives_a_restart() {
    let temp = TempDir::new().unwrap();
    let parsed = vtu_translate::strings_xml::parse_strings_xml(STRINGS_XML.as_bytes()).unwrap();
    let path = Session::default_path(temp.path());

    let session = Session::new("res/values/strings.xml", "vi", parsed.resources);
    session.save(&path).unwrap();
    assert!(read(&temp.child(".vtu/session.json")).contains("\"target_language\": \"vi\""));

    let restored = Session::load(&path).unwrap();
    let store = ResourceStore::with_resources(restored.resources);
    assert_eq!(store.first_incomplete_index(), Some(0));
    assert_eq!(store.progress().done, 3);
}
