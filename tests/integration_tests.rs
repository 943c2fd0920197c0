use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use study_engine::{
    Answer, GenerationKind, GenerationOptions, JsonFileStorage, MemoryStorage, ProviderGateway,
    QuotaManager, ServiceMode, ServiceState, Storage, StudyEngine,
};

const SAMPLE_TEXT: &str = "운영체제는 컴퓨터 자원을 관리하는 소프트웨어이다. \
                           커널이란 운영체제의 핵심 부분이다. \
                           메모리 부족 때문에 시스템 응답이 느려진다. \
                           성능을 개선하려면 캐시를 적극 활용해야 한다. \
                           해시 테이블의 장점은 빠른 조회 속도이다.";

fn state_in_mode(mode: ServiceMode, daily: u32, used: u32) -> ServiceState {
    let mut state = ServiceState::new(daily, 1000, Utc::now().date_naive());
    state.mode = mode;
    state.used_quota = used;
    state
}

async fn engine_with_state(state: ServiceState) -> StudyEngine {
    let storage = Arc::new(MemoryStorage::new());
    let quota = QuotaManager::with_state(storage.clone() as Arc<dyn Storage>, state);
    let gateway = ProviderGateway::new(quota, None).with_distractor_seed(11);
    StudyEngine::new(gateway, storage as Arc<dyn Storage>)
}

#[tokio::test]
async fn exhausted_quota_degrades_to_rule_based_content() {
    // Free mode, daily quota fully consumed: the gate must divert to the
    // rule-based path before the (unconfigured) provider is ever touched.
    let mut engine = engine_with_state(state_in_mode(ServiceMode::Free, 3, 3)).await;
    let options = GenerationOptions { count: 3, ..Default::default() };

    let items = engine
        .generate_items(GenerationKind::Flashcards, SAMPLE_TEXT, None, &options)
        .await
        .unwrap();

    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| !i.tags.contains(&"mock".to_string())));
    assert!(items.iter().all(|i| i.explanation.is_some()));
    // Mode unchanged, counters untouched
    assert_eq!(engine.mode(), ServiceMode::Free);
    assert_eq!(engine.remaining_quota().daily, 0);
}

#[tokio::test]
async fn mock_mode_yields_stable_sample_content() {
    let mut engine = engine_with_state(state_in_mode(ServiceMode::Mock, 10, 0)).await;
    let options = GenerationOptions { count: 3, ..Default::default() };

    let first = engine
        .generate_items(GenerationKind::Quiz, SAMPLE_TEXT, None, &options)
        .await
        .unwrap();
    let second = engine
        .generate_items(GenerationKind::Quiz, SAMPLE_TEXT, None, &options)
        .await
        .unwrap();

    let first_prompts: Vec<&str> = first.iter().map(|i| i.prompt.as_str()).collect();
    let second_prompts: Vec<&str> = second.iter().map(|i| i.prompt.as_str()).collect();
    assert_eq!(first_prompts, second_prompts);
    assert!(first.iter().all(|i| i.tags.contains(&"mock".to_string())));
    assert!(first.iter().all(|i| i.options.as_ref().unwrap().len() == 4));
    // The keyed option is a sentence sliced from the source text
    assert!(first[0].options.as_ref().unwrap()[0].contains("운영체제"));
    assert_eq!(engine.remaining_quota().daily, 10);
}

#[tokio::test]
async fn degenerate_input_never_errors() {
    let mut engine = engine_with_state(state_in_mode(ServiceMode::Offline, 10, 0)).await;
    let options = GenerationOptions::default();

    for kind in [
        GenerationKind::Flashcards,
        GenerationKind::Quiz,
        GenerationKind::Summary,
        GenerationKind::Keywords,
    ] {
        let empty = engine.generate_items(kind, "", None, &options).await.unwrap();
        assert!(empty.is_empty(), "empty text must yield no items for {:?}", kind);

        let short = engine.generate_items(kind, "짧다.", None, &options).await.unwrap();
        assert!(short.is_empty(), "too-short text must yield no items for {:?}", kind);
    }
}

#[tokio::test]
async fn generated_prompts_are_unique_after_ranking() {
    let mut engine = engine_with_state(state_in_mode(ServiceMode::Offline, 10, 0)).await;
    // Repetitive source: the same sentence over and over
    let text = "운영체제는 컴퓨터 자원을 관리하는 소프트웨어이다. ".repeat(6);
    let options = GenerationOptions { count: 5, ..Default::default() };

    let items = engine
        .generate_items(GenerationKind::Flashcards, &text, None, &options)
        .await
        .unwrap();

    assert!(!items.is_empty());
    let mut prompts: Vec<&str> = items.iter().map(|i| i.prompt.as_str()).collect();
    prompts.sort_unstable();
    prompts.dedup();
    assert_eq!(prompts.len(), items.len(), "near-duplicate prompts must be collapsed");
}

#[tokio::test]
async fn full_lifecycle_against_file_storage() {
    let dir = std::env::temp_dir().join(format!("study-engine-it-{}", Uuid::new_v4()));
    let storage = Arc::new(JsonFileStorage::new(&dir).await.unwrap());

    let quota = QuotaManager::with_state(
        storage.clone() as Arc<dyn Storage>,
        state_in_mode(ServiceMode::Offline, 10, 0),
    );
    let gateway = ProviderGateway::new(quota, None).with_distractor_seed(11);
    let mut engine = StudyEngine::new(gateway, storage.clone() as Arc<dyn Storage>);

    let options = GenerationOptions { count: 3, ..Default::default() };
    let items = engine
        .generate_items(GenerationKind::Flashcards, SAMPLE_TEXT, Some("lecture-1"), &options)
        .await
        .unwrap();
    assert_eq!(items.len(), 3);

    // Review one item: schedule moves forward and survives a reload
    let now = Utc::now();
    let reviewed = engine
        .review_item_at(GenerationKind::Flashcards, items[0].id, 5, now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reviewed.repetitions, 1);
    assert_eq!(reviewed.next_review, now + Duration::days(1));

    let reloaded = JsonFileStorage::new(&dir).await.unwrap();
    let persisted = reloaded.get_all("flashcards").await.unwrap();
    let persisted_item = persisted.iter().find(|i| i.id == items[0].id).unwrap();
    assert_eq!(persisted_item.repetitions, 1);
    assert_eq!(persisted_item.last_reviewed, Some(now));

    // Reviewed item is no longer due; the others still are
    let due = engine.due_items(GenerationKind::Flashcards, now).await.unwrap();
    assert_eq!(due.len(), 2);

    // Dropping the source document clears everything it produced
    let removed = engine
        .delete_document(GenerationKind::Flashcards, "lecture-1")
        .await
        .unwrap();
    assert_eq!(removed, 3);
    assert!(engine.due_items(GenerationKind::Flashcards, now).await.unwrap().is_empty());

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn service_state_survives_restart() {
    let dir = std::env::temp_dir().join(format!("study-engine-it-{}", Uuid::new_v4()));
    let storage = Arc::new(JsonFileStorage::new(&dir).await.unwrap());

    {
        let mut quota = QuotaManager::load_or_init(storage.clone() as Arc<dyn Storage>, 5, 50)
            .await
            .unwrap();
        quota.increment_usage().await.unwrap();
        quota.increment_usage().await.unwrap();
        quota.set_mode(ServiceMode::Offline).await.unwrap();
    }

    // Fresh manager over the same directory sees the persisted counters
    let quota = QuotaManager::load_or_init(storage.clone() as Arc<dyn Storage>, 5, 50)
        .await
        .unwrap();
    assert_eq!(quota.state().used_quota, 2);
    assert_eq!(quota.state().used_monthly_quota, 2);
    assert_eq!(quota.mode(), ServiceMode::Offline);
    assert_eq!(quota.get_remaining().daily, 3);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn quiz_answers_resolve_through_options() {
    let mut engine = engine_with_state(state_in_mode(ServiceMode::Offline, 10, 0)).await;
    let options = GenerationOptions { count: 3, ..Default::default() };

    let items = engine
        .generate_items(GenerationKind::Quiz, SAMPLE_TEXT, None, &options)
        .await
        .unwrap();
    assert!(!items.is_empty());

    for item in &items {
        let Answer::Index(position) = item.answer else {
            panic!("offline quiz answers must be option indices");
        };
        let choices = item.options.as_ref().unwrap();
        assert!(position < choices.len());
        assert_eq!(item.answer_text(), choices[position]);
        assert!(!item.answer_text().is_empty());
    }
}
