//! Initial load.

use serde_json::json;

use super::{memory_store, readings, values, Reading};
use crate::store::LogStore;
use crate::{SqliteLogStore, Seq, SyncEngine, SyncError};

#[tokio::test]
async fn empty_store_gives_empty_mirror() {
    let store = memory_store().await;
    let engine = SyncEngine::create(store, readings()).await.unwrap();

    assert_eq!(engine.len(), 0);
    assert!(engine.is_empty());
    assert_eq!(engine.frontier(), Seq::ZERO);
}

#[tokio::test]
async fn existing_row_is_loaded() {
    let store = memory_store().await;
    store.insert_one(json!({"value": 42})).await.unwrap();

    let engine = SyncEngine::create(store, readings()).await.unwrap();

    assert_eq!(engine.len(), 1);
    let view = engine.snapshot();
    assert_eq!(view[0].data, Reading::new(42));
    assert_eq!(view[0].seq, Seq(1));
    assert_eq!(engine.frontier(), Seq(1));
}

#[tokio::test]
async fn load_preserves_commit_order() {
    let store = memory_store().await;
    store
        .insert_many(vec![json!({"value": 3}), json!({"value": 1})])
        .await
        .unwrap();
    store.insert_one(json!({"value": 2})).await.unwrap();

    let engine = SyncEngine::create(store, readings()).await.unwrap();

    assert_eq!(values(&engine), vec![3, 1, 2]);
    assert_eq!(engine.frontier(), Seq(3));
}

#[tokio::test]
async fn missing_table_fails_with_store_error() {
    let store = SqliteLogStore::in_memory("never_created").await.unwrap();

    let result = SyncEngine::create(std::sync::Arc::new(store), readings()).await;

    assert!(matches!(result, Err(SyncError::Store(_))));
}

#[tokio::test]
async fn keyword_table_name_round_trips() {
    let store = SqliteLogStore::in_memory("order").await.unwrap();
    store.ensure_table().await.unwrap();
    store.insert_one(json!({"value": 1})).await.unwrap();

    let engine = SyncEngine::create(std::sync::Arc::new(store), readings()).await.unwrap();
    engine.append(&Reading::new(2)).await.unwrap();
    engine.poll().await.unwrap();

    assert_eq!(values(&engine), vec![1, 2]);
}

#[tokio::test]
async fn initial_load_does_not_feed_live_tails() {
    let store = memory_store().await;
    store.insert_one(json!({"value": 1})).await.unwrap();

    let engine = SyncEngine::create(store, readings()).await.unwrap();
    let mut tail = engine.subscribe();

    assert!(tail.try_recv().is_none());
}
