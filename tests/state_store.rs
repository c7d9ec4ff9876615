//! State Store round-trips (`spec.md` §4.8, §8), exercising both the
//! in-memory and file-backed implementations as a black box over the public
//! `StateStore` trait.

use article_pipeline::state::PipelineState;
use article_pipeline::store::{FileStateStore, InMemoryStateStore, StateStore};

#[tokio::test]
async fn in_memory_round_trips() {
    let store = InMemoryStateStore::new();
    let mut state = PipelineState::new("job-1");
    state.recompute_last_stage();
    store.save(&state).await.unwrap();
    let loaded = store.load("job-1").await.unwrap();
    assert_eq!(loaded, Some(state));
}

#[tokio::test]
async fn in_memory_load_missing_is_none() {
    let store = InMemoryStateStore::new();
    assert_eq!(store.load("nope").await.unwrap(), None);
}

#[tokio::test]
async fn in_memory_delete_removes_state() {
    let store = InMemoryStateStore::new();
    let state = PipelineState::new("job-9");
    store.save(&state).await.unwrap();
    store.delete("job-9").await.unwrap();
    assert_eq!(store.load("job-9").await.unwrap(), None);
}

#[tokio::test]
async fn in_memory_delete_missing_is_not_an_error() {
    let store = InMemoryStateStore::new();
    assert!(store.delete("never-saved").await.is_ok());
}

#[tokio::test]
async fn file_store_round_trips_and_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::new(dir.path());
    let state = PipelineState::new("job-42");
    store.save(&state).await.unwrap();

    let loaded = store.load("job-42").await.unwrap();
    assert_eq!(loaded, Some(state));

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].as_ref().unwrap().file_name().to_string_lossy().ends_with(".json"));
}

#[tokio::test]
async fn file_store_load_missing_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::new(dir.path());
    assert_eq!(store.load("absent").await.unwrap(), None);
}

#[tokio::test]
async fn file_store_delete_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::new(dir.path());
    let state = PipelineState::new("job-11");
    store.save(&state).await.unwrap();
    store.delete("job-11").await.unwrap();
    assert_eq!(store.load("job-11").await.unwrap(), None);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn file_store_delete_missing_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::new(dir.path());
    assert!(store.delete("never-saved").await.is_ok());
}

#[tokio::test]
async fn file_store_rejects_unsupported_format_version() {
    use article_pipeline::state::PersistedPipelineState;

    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::new(dir.path());

    let mut envelope = serde_json::to_value(PersistedPipelineState::from(&PipelineState::new("job-99"))).unwrap();
    envelope["format_version"] = serde_json::json!(999);
    std::fs::write(dir.path().join("job-99.json"), serde_json::to_vec(&envelope).unwrap()).unwrap();

    let err = store.load("job-99").await.unwrap_err();
    assert!(matches!(err, article_pipeline::error::StateStoreError::Unreadable { .. }));
}

#[tokio::test]
async fn file_store_overwrites_existing_state() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::new(dir.path());
    let mut state = PipelineState::new("job-7");
    store.save(&state).await.unwrap();

    state.last_stage = 3;
    store.save(&state).await.unwrap();

    let loaded = store.load("job-7").await.unwrap().unwrap();
    assert_eq!(loaded.last_stage, 3);
}
