//! Engine-level tests for the log mirror.
//!
//! - `create.rs`   - Initial load
//! - `append.rs`   - Write path and the outbound schema gate
//! - `poll.rs`     - Cursor catch-up and restarts
//! - `poison.rs`   - Invalid rows already in the store
//! - `writers.rs`  - Several writers on one database file
//! - `notifier.rs` - Change notifications, drains, and the state machine

mod create;

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{FieldIssue, JsonSchema, SqliteLogStore};

pub(crate) const TABLE: &str = "readings";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Reading {
    pub value: i64,
}

impl Reading {
    pub fn new(value: i64) -> Self {
        Self { value }
    }
}

/// Readings must be non-negative.
pub(crate) fn readings() -> JsonSchema<Reading> {
    JsonSchema::new().check(|r: &Reading| {
        if r.value >= 0 {
            Ok(())
        } else {
            Err(FieldIssue::new("$.value", "must be non-negative"))
        }
    })
}

/// A provisioned store over a private in-memory database.
pub(crate) async fn memory_store() -> Arc<SqliteLogStore> {
    let store = SqliteLogStore::in_memory(TABLE).await.unwrap();
    store.ensure_table().await.unwrap();
    Arc::new(store)
}

/// A provisioned store over its own connection to a database file.
pub(crate) async fn file_store(path: &Path) -> Arc<SqliteLogStore> {
    let store = SqliteLogStore::open(path, TABLE).await.unwrap();
    store.ensure_table().await.unwrap();
    Arc::new(store)
}

/// Values of the mirrored rows, in mirror order.
pub(crate) fn values<L: crate::LogStore>(engine: &crate::SyncEngine<JsonSchema<Reading>, L>) -> Vec<i64> {
    engine.snapshot().records().map(|r| r.value).collect()
}
