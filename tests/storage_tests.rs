use chrono::{NaiveDate, Utc};
use std::path::PathBuf;
use uuid::Uuid;

use study_engine::{
    Answer, JsonFileStorage, ServiceMode, ServiceState, Storage, StudyItem,
};

fn temp_data_dir() -> PathBuf {
    std::env::temp_dir().join(format!("study-engine-storage-{}", Uuid::new_v4()))
}

fn item(prompt: &str, doc: Option<&str>) -> StudyItem {
    let mut item = StudyItem::new(prompt.to_string(), Answer::Text("정답".to_string()));
    item.source_document_id = doc.map(str::to_string);
    item
}

#[tokio::test]
async fn collections_are_isolated_per_kind() {
    let dir = temp_data_dir();
    let storage = JsonFileStorage::new(&dir).await.unwrap();

    storage.save_many("flashcards", &[item("카드 질문", None)]).await.unwrap();
    storage.save_many("quiz", &[item("퀴즈 질문 하나", None), item("퀴즈 질문 둘", None)]).await.unwrap();

    assert_eq!(storage.get_all("flashcards").await.unwrap().len(), 1);
    assert_eq!(storage.get_all("quiz").await.unwrap().len(), 2);
    assert!(storage.get_all("keywords").await.unwrap().is_empty());

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn full_item_round_trips_through_disk() {
    let dir = temp_data_dir();
    let storage = JsonFileStorage::new(&dir).await.unwrap();

    let mut original = item("'커널'이란 무엇인가?", Some("doc-7"));
    original.options = Some(vec![
        "운영체제의 핵심 부분".to_string(),
        "오답 보기 1".to_string(),
        "오답 보기 2".to_string(),
        "오답 보기 3".to_string(),
    ]);
    original.answer = Answer::Index(0);
    original.difficulty = 4.5;
    original.interval = 6;
    original.repetitions = 2;
    original.easiness_factor = 2.36;
    original.last_reviewed = Some(Utc::now());
    original.tags = vec!["terminology".to_string()];
    original.hint = Some("부팅할 때 가장 먼저 적재된다".to_string());
    original.explanation = Some("커널이란 운영체제의 핵심 부분이다.".to_string());
    original.examples = vec!["리눅스 커널".to_string()];

    storage.save_many("quiz", std::slice::from_ref(&original)).await.unwrap();

    // Re-open the directory as a separate store, as a restart would
    let reopened = JsonFileStorage::new(&dir).await.unwrap();
    let loaded = reopened.get_all("quiz").await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0], original);
    assert_eq!(loaded[0].answer_text(), "운영체제의 핵심 부분");

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn upsert_replaces_by_id_without_duplicating() {
    let dir = temp_data_dir();
    let storage = JsonFileStorage::new(&dir).await.unwrap();

    let original = item("원래 질문", None);
    storage.save_many("flashcards", std::slice::from_ref(&original)).await.unwrap();

    let mut updated = original.clone();
    updated.prompt = "수정된 질문".to_string();
    updated.repetitions = 3;
    storage.save_many("flashcards", std::slice::from_ref(&updated)).await.unwrap();

    let loaded = storage.get_all("flashcards").await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].prompt, "수정된 질문");
    assert_eq!(loaded[0].repetitions, 3);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn delete_by_document_only_touches_matching_items() {
    let dir = temp_data_dir();
    let storage = JsonFileStorage::new(&dir).await.unwrap();

    storage
        .save_many(
            "flashcards",
            &[item("질문 A", Some("doc-a")), item("질문 B", Some("doc-b")), item("질문 C", None)],
        )
        .await
        .unwrap();

    let removed = storage.delete_by_document("flashcards", "doc-a").await.unwrap();
    assert_eq!(removed, 1);

    let remaining = storage.get_all("flashcards").await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|i| i.source_document_id.as_deref() != Some("doc-a")));

    // Unknown documents remove nothing and do not error
    assert_eq!(storage.delete_by_document("flashcards", "doc-x").await.unwrap(), 0);
    assert_eq!(storage.delete_by_document("missing", "doc-a").await.unwrap(), 0);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn service_state_document_round_trips() {
    let dir = temp_data_dir();
    let storage = JsonFileStorage::new(&dir).await.unwrap();

    assert!(storage.load_state().await.unwrap().is_none());

    let mut state = ServiceState::new(50, 1000, NaiveDate::from_ymd_opt(2026, 8, 30).unwrap());
    state.mode = ServiceMode::Custom;
    state.used_quota = 17;
    state.used_monthly_quota = 431;
    state.api_key = Some("sk-roundtrip".to_string());
    storage.save_state(&state).await.unwrap();

    // Last writer wins on repeated saves
    state.used_quota = 18;
    storage.save_state(&state).await.unwrap();

    let reopened = JsonFileStorage::new(&dir).await.unwrap();
    let loaded = reopened.load_state().await.unwrap().unwrap();
    assert_eq!(loaded, state);
    assert_eq!(loaded.used_quota, 18);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}
