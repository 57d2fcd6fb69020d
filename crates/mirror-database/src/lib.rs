//! SQLite database layer for rowmirror.
//!
//! This crate provides:
//! - Async SQLite executor with a dedicated thread
//! - Append-only log tables (`seq` assigned by SQLite, `data` as JSON text)
//! - Query helpers for loading, inserting, and cursor catch-up
//!
//! # Architecture
//!
//! The `AsyncDatabase` uses a single dedicated thread for all SQLite operations.
//! Queries are sent through a channel and executed in FIFO order.
//!
//! ```ignore
//! let db = AsyncDatabase::open(path).await?;
//! let table = LogTable::new("readings")?;
//! let rows = db.call(move |conn| queries::fetch_since(conn, &table, 0)).await?;
//! ```
//!
//! **Important**: Only SQL operations should run inside `db.call()`.
//! JSON encoding and decoding happen outside.

mod error;
mod executor;
mod models;
pub mod queries;

pub use error::{DatabaseError, DatabaseResult};
pub use executor::{AsyncDatabase, DatabaseOptions};
pub use models::{LogTable, StoredRow};
