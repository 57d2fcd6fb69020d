//! Log store contract.
//!
//! A log store is a durable, append-only table whose sequence numbers are
//! assigned by the store itself. The store does not validate payloads; the
//! schema gate runs on both sides of it.

use async_trait::async_trait;
use mirror_database::DatabaseError;
use serde_json::Value;

use crate::types::{RawRow, Seq};

/// Errors raised by a log store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying database failed.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// A stored payload is not decodable as JSON.
    #[error("row {seq} holds an undecodable payload: {source}")]
    Decode {
        seq: Seq,
        #[source]
        source: serde_json::Error,
    },

    /// A payload could not be encoded for storage.
    #[error("failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A durable, append-only, store-sequenced log.
///
/// All reads return rows ascending by seq.
#[async_trait]
pub trait LogStore: Send + Sync + 'static {
    /// A name for this log, used in logs and drain reports.
    fn name(&self) -> &str;

    /// Loads every row.
    async fn load_all(&self) -> Result<Vec<RawRow>, StoreError>;

    /// Inserts one payload. The row is durable when this returns.
    async fn insert_one(&self, data: Value) -> Result<RawRow, StoreError>;

    /// Inserts payloads atomically.
    ///
    /// Either every payload commits or none does. Returned rows line up
    /// positionally with the input and are ascending by seq.
    async fn insert_many(&self, data: Vec<Value>) -> Result<Vec<RawRow>, StoreError>;

    /// Loads every row with `seq > last_seq`.
    async fn fetch_since(&self, last_seq: Seq) -> Result<Vec<RawRow>, StoreError>;
}
