//! SQLite access on a dedicated thread.
//!
//! Every query runs on the one thread owned by `tokio_rusqlite`, in the order
//! it was submitted. Callers await the result without blocking the runtime.
//! Handles are cheap to clone, so several log tables can share a connection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::{DatabaseError, DatabaseResult};

/// Connection settings applied right after opening.
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    /// How long a writer waits for another connection's lock.
    pub busy_timeout: Duration,
    /// Use write-ahead logging so readers never block the writer.
    pub wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            wal: true,
        }
    }
}

impl DatabaseOptions {
    fn pragmas(&self) -> String {
        let journal = if self.wal { "WAL" } else { "DELETE" };
        format!(
            "PRAGMA journal_mode = {journal};
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        )
    }
}

fn map_executor_error(e: tokio_rusqlite::Error) -> DatabaseError {
    match e {
        tokio_rusqlite::Error::Rusqlite(e) => DatabaseError::Sqlite(e),
        tokio_rusqlite::Error::ConnectionClosed => DatabaseError::Connection("connection closed".to_string()),
        other => DatabaseError::Connection(other.to_string()),
    }
}

/// Handle to one SQLite connection served by a background thread.
#[derive(Clone)]
pub struct AsyncDatabase {
    conn: Connection,
    /// None for in-memory databases.
    path: Option<PathBuf>,
}

impl AsyncDatabase {
    /// Opens (or creates) the database file at `path`, creating missing
    /// parent directories.
    pub async fn open(path: &Path) -> DatabaseResult<Self> {
        Self::open_with(path, DatabaseOptions::default()).await
    }

    /// Like [`AsyncDatabase::open`], with explicit connection settings.
    pub async fn open_with(path: &Path, options: DatabaseOptions) -> DatabaseResult<Self> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)?,
            _ => {}
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        let db = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        db.apply(&options).await?;

        info!(path = %path.display(), "Opened database");
        Ok(db)
    }

    /// Opens a private in-memory database. Two calls never share data.
    pub async fn open_in_memory() -> DatabaseResult<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        let db = Self { conn, path: None };
        db.apply(&DatabaseOptions::default()).await?;
        Ok(db)
    }

    async fn apply(&self, options: &DatabaseOptions) -> DatabaseResult<()> {
        let pragmas = options.pragmas();
        self.call_sqlite(move |conn| conn.execute_batch(&pragmas)).await?;
        debug!(?options, "Applied connection settings");
        Ok(())
    }

    /// Runs `f` on the database thread and returns its result.
    ///
    /// Keep the closure to SQL and row mapping; anything slow in here delays
    /// every other table sharing the connection.
    pub async fn call<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DatabaseResult<T> + Send + 'static,
        T: Send + 'static,
    {
        // Nest our result inside the executor's Ok so domain errors survive.
        self.conn
            .call(move |conn| Ok(f(conn)))
            .await
            .map_err(map_executor_error)?
    }

    /// Runs a closure that only produces rusqlite errors.
    pub async fn call_sqlite<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn| f(conn).map_err(tokio_rusqlite::Error::from))
            .await
            .map_err(map_executor_error)
    }

    /// The database file, or None when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Round-trips a trivial query through the database thread.
    pub async fn health_check(&self) -> DatabaseResult<()> {
        let one: i64 = self
            .call_sqlite(|conn| conn.query_row("SELECT 1", [], |row| row.get(0)))
            .await?;
        if one != 1 {
            return Err(DatabaseError::InvalidData(format!("health check returned {one}")));
        }
        Ok(())
    }
}
