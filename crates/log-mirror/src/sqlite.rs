//! SQLite log store.
//!
//! SQLite is the only durable store. Mirrors are rebuilt from it on startup
//! and caught up from it by cursor; nothing else is trusted.

use std::path::Path;

use async_trait::async_trait;
use mirror_database::{queries, AsyncDatabase, LogTable, StoredRow};
use serde_json::Value;
use tracing::debug;

use crate::store::{LogStore, StoreError};
use crate::types::{RawRow, Seq};

/// A log store backed by one SQLite table.
///
/// Cloning is cheap; clones share the database executor thread. Several
/// stores over different tables may share one [`AsyncDatabase`].
#[derive(Clone)]
pub struct SqliteLogStore {
    db: AsyncDatabase,
    table: LogTable,
}

impl SqliteLogStore {
    /// Creates a store over `table` in an already-open database.
    ///
    /// The table is not created; see [`SqliteLogStore::ensure_table`].
    pub fn new(db: AsyncDatabase, table: &str) -> Result<Self, StoreError> {
        let table = LogTable::new(table)?;
        Ok(Self { db, table })
    }

    /// Opens the database file at `path` and creates a store over `table`.
    pub async fn open(path: impl AsRef<Path>, table: &str) -> Result<Self, StoreError> {
        let table = LogTable::new(table)?;
        let db = AsyncDatabase::open(path.as_ref()).await?;
        Ok(Self { db, table })
    }

    /// Creates a store over a private in-memory database.
    ///
    /// Useful for testing.
    pub async fn in_memory(table: &str) -> Result<Self, StoreError> {
        let table = LogTable::new(table)?;
        let db = AsyncDatabase::open_in_memory().await?;
        Ok(Self { db, table })
    }

    /// Creates the log table if it does not exist.
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        let table = self.table.clone();
        self.db
            .call(move |conn| queries::ensure_log_table(conn, &table))
            .await?;
        Ok(())
    }

    /// Returns the number of stored rows.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let table = self.table.clone();
        Ok(self.db.call(move |conn| queries::count(conn, &table)).await?)
    }

    /// Returns the shared database handle.
    pub fn database(&self) -> &AsyncDatabase {
        &self.db
    }

    /// Returns the table name.
    pub fn table(&self) -> &LogTable {
        &self.table
    }
}

#[async_trait]
impl LogStore for SqliteLogStore {
    fn name(&self) -> &str {
        self.table.as_str()
    }

    async fn load_all(&self) -> Result<Vec<RawRow>, StoreError> {
        let table = self.table.clone();
        let stored = self.db.call(move |conn| queries::load_all(conn, &table)).await?;
        debug!(table = %self.table, rows = stored.len(), "Loaded log table");
        decode_rows(stored)
    }

    async fn insert_one(&self, data: Value) -> Result<RawRow, StoreError> {
        let payload = serde_json::to_string(&data).map_err(StoreError::Encode)?;
        let table = self.table.clone();
        let seq = self
            .db
            .call(move |conn| queries::insert_one(conn, &table, &payload))
            .await?;
        Ok(RawRow {
            seq: Seq(seq),
            data,
        })
    }

    async fn insert_many(&self, data: Vec<Value>) -> Result<Vec<RawRow>, StoreError> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        let payloads = data
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Encode)?;
        let table = self.table.clone();
        let seqs = self
            .db
            .call(move |conn| queries::insert_many(conn, &table, &payloads))
            .await?;

        Ok(seqs
            .into_iter()
            .zip(data)
            .map(|(seq, data)| RawRow { seq: Seq(seq), data })
            .collect())
    }

    async fn fetch_since(&self, last_seq: Seq) -> Result<Vec<RawRow>, StoreError> {
        let table = self.table.clone();
        let stored = self
            .db
            .call(move |conn| queries::fetch_since(conn, &table, last_seq.value()))
            .await?;
        decode_rows(stored)
    }
}

/// Decodes JSON text outside the executor thread.
fn decode_rows(stored: Vec<StoredRow>) -> Result<Vec<RawRow>, StoreError> {
    stored
        .into_iter()
        .map(|row| {
            let seq = Seq(row.seq);
            serde_json::from_str(&row.data)
                .map(|data| RawRow { seq, data })
                .map_err(|source| StoreError::Decode { seq, source })
        })
        .collect()
}
