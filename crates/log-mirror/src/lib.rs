//! # log-mirror
//!
//! Mirrors an append-only, store-sequenced SQLite log into an ordered
//! in-memory sequence and keeps it converged.
//!
//! ## Non-negotiable Principles
//!
//! - **SQLite assigns every seq** - Callers never pick sequence numbers
//! - **Every boundary is schema-gated** - Appends are validated before the write,
//!   read-backs before they reach the mirror
//! - **Catch-up is keyed by the frontier** - `seq > frontier`, never a row count
//! - **The mirror only grows** - Gap-free, ascending, never truncated
//! - **Notifications are advisory** - A missed signal is healed by the next poll
//!
//! ## Architecture
//!
//! ```text
//! WRITE:
//!   schema gate → SQLite (seq assigned) → notify
//!
//! CONVERGE:
//!   signal → poll every pollable (fetch_since frontier → schema gate → push) → step once
//!
//! READ:
//!   snapshot / len / fold / live tail (never I/O)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use log_mirror::{JsonSchema, SqliteLogStore, SyncEngine};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! struct Reading {
//!     value: i64,
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteLogStore::in_memory("readings").await?);
//! store.ensure_table().await?;
//!
//! let engine = SyncEngine::create(store, JsonSchema::<Reading>::new()).await?;
//! engine.append_many(&[Reading { value: 1 }, Reading { value: 2 }]).await?;
//! engine.poll().await?;
//!
//! assert_eq!(engine.fold(0, |sum, row| sum + row.data.value), 3);
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - [`engine`] - The sync engine (create, append, poll)
//! - [`schema`] - Schema gate
//! - [`store`] - Log store contract
//! - [`mirror`] - In-memory mirror and snapshots
//! - [`live`] - Live tail of mirrored batches
//! - [`reader`] - Read-side trait
//! - [`channel`] - Named broadcast channels
//! - [`notifier`] - Change notifier and pollable registry
//! - [`reactor`] - Computation-engine step contract
//! - [`types`] - Core types

pub mod channel;
pub mod engine;
pub mod live;
pub mod mirror;
pub mod notifier;
pub mod reactor;
pub mod reader;
pub mod schema;
mod sqlite;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use channel::{Channel, ChannelError, LocalChannels, Subscription};
pub use engine::{EngineOptions, SyncEngine};
pub use live::LiveTail;
pub use mirror::{Mirror, MirrorView};
pub use notifier::{DrainReport, Notifier, NotifierStatus, PollFailure, Pollable};
pub use reactor::{FnReactor, NullReactor, Reactor, RecordingReactor};
pub use reader::MirrorReader;
pub use schema::{FieldIssue, JsonSchema, Schema, ValidationError};
pub use sqlite::SqliteLogStore;
pub use store::{LogStore, StoreError};
pub use types::{RawRow, Row, Seq};

/// Errors that can occur while synchronizing a mirror.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A payload failed the schema on write or read-back.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The log store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The notification channel failed.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// A batch would break the ascending seq order of the mirror.
    #[error("rows out of order: seq {next} after seq {previous}")]
    OutOfOrder { previous: Seq, next: Seq },
}

/// Result type alias using SyncError.
pub type SyncResult<T> = Result<T, SyncError>;
