//! The sync engine: one mirror kept converged with one log store.
//!
//! # Write Path (strict order)
//!
//! 1. Run every record through the schema gate
//! 2. Commit to the store (the store assigns seqs)
//! 3. Optionally catch up by cursor
//!
//! If step 1 fails, nothing is written.
//!
//! # Catch-up Path
//!
//! 1. `fetch_since(frontier)`
//! 2. Validate the whole batch
//! 3. Extend the mirror and advance the frontier
//!
//! If step 1 or 2 fails, the mirror is untouched.
//!
//! # Creation
//!
//! On `create`:
//! 1. Load every row
//! 2. Validate every row
//! 3. Build the mirror
//!
//! A single invalid row fails creation; no engine is produced.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::live::LiveTail;
use crate::mirror::{Mirror, MirrorView};
use crate::reader::MirrorReader;
use crate::schema::{Schema, ValidationError};
use crate::store::LogStore;
use crate::types::{RawRow, Row, Seq};
use crate::SyncResult;

/// Options for a sync engine.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Run a cursor catch-up right after every successful append.
    ///
    /// The appended rows then become visible in the mirror before `append`
    /// returns, together with anything other writers committed before them.
    pub catch_up_on_append: bool,
}

/// Keeps one mirror converged with one log store.
pub struct SyncEngine<S: Schema, L: LogStore> {
    store: Arc<L>,
    schema: S,
    mirror: Mirror<S::Record>,
    options: EngineOptions,
    /// Serializes fetch-and-extend so catch-ups never interleave.
    poll_lock: Mutex<()>,
}

impl<S: Schema, L: LogStore> SyncEngine<S, L> {
    /// Loads and validates every stored row, then builds the mirror.
    pub async fn create(store: Arc<L>, schema: S) -> SyncResult<Self> {
        Self::create_with_options(store, schema, EngineOptions::default()).await
    }

    /// Like [`SyncEngine::create`], with options.
    pub async fn create_with_options(store: Arc<L>, schema: S, options: EngineOptions) -> SyncResult<Self> {
        info!(log = store.name(), "mirror: starting initial load");

        let raw = store.load_all().await?;
        let rows = validate_batch(&schema, raw)?;
        let mirror = Mirror::from_rows(rows)?;

        info!(
            log = store.name(),
            rows = mirror.len(),
            frontier = %mirror.frontier(),
            "mirror: initial load complete"
        );

        Ok(Self {
            store,
            schema,
            mirror,
            options,
            poll_lock: Mutex::new(()),
        })
    }

    /// Returns the log store.
    pub fn store(&self) -> &Arc<L> {
        &self.store
    }

    /// Returns the schema.
    pub fn schema(&self) -> &S {
        &self.schema
    }

    /// Validates and durably appends one record.
    ///
    /// Returns the stored row. The mirror is extended by the next poll, or
    /// immediately when `catch_up_on_append` is set.
    pub async fn append(&self, record: &S::Record) -> SyncResult<Row<S::Record>> {
        let (payload, data) = self.schema.admit(record)?;
        let raw = self.store.insert_one(payload).await?;
        debug!(log = self.store.name(), seq = %raw.seq, "mirror: appended record");

        self.catch_up_after_append().await;
        Ok(Row { seq: raw.seq, data })
    }

    /// Validates and durably appends records as one atomic batch.
    ///
    /// Every record is validated before anything is written; one invalid
    /// record rejects the whole call.
    pub async fn append_many(&self, records: &[S::Record]) -> SyncResult<Vec<Row<S::Record>>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let (payloads, data): (Vec<_>, Vec<_>) = records
            .iter()
            .map(|record| self.schema.admit(record))
            .collect::<Result<Vec<_>, ValidationError>>()?
            .into_iter()
            .unzip();

        let raw = self.store.insert_many(payloads).await?;
        debug!(log = self.store.name(), count = raw.len(), "mirror: appended batch");

        self.catch_up_after_append().await;
        Ok(raw
            .into_iter()
            .zip(data)
            .map(|(raw, data)| Row { seq: raw.seq, data })
            .collect())
    }

    /// Catches the mirror up with every row past its frontier.
    ///
    /// Returns the number of rows appended to the mirror. An empty fetch is a
    /// successful no-op. If any fetched row fails the schema, nothing is
    /// applied and the frontier stays where it was.
    pub async fn poll(&self) -> SyncResult<usize> {
        let _guard = self.poll_lock.lock().await;

        let frontier = self.mirror.frontier();
        let raw = self.store.fetch_since(frontier).await?;
        if raw.is_empty() {
            return Ok(0);
        }

        let rows = validate_batch(&self.schema, raw)?;
        let appended = self.mirror.push(rows)?;

        debug!(
            log = self.store.name(),
            appended,
            frontier = %self.mirror.frontier(),
            "mirror: caught up"
        );
        Ok(appended)
    }

    /// Returns an immutable snapshot of the mirror.
    pub fn snapshot(&self) -> MirrorView<S::Record> {
        self.mirror.snapshot()
    }

    pub fn len(&self) -> usize {
        self.mirror.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirror.is_empty()
    }

    /// Returns the highest mirrored seq.
    pub fn frontier(&self) -> Seq {
        self.mirror.frontier()
    }

    /// Folds over the mirrored rows in seq order.
    pub fn fold<A, F>(&self, init: A, f: F) -> A
    where
        F: FnMut(A, &Row<S::Record>) -> A,
    {
        self.mirror.fold(init, f)
    }

    /// Subscribes to batches appended to the mirror from now on.
    pub fn subscribe(&self) -> LiveTail<S::Record> {
        self.mirror.subscribe()
    }

    /// The write is already durable here, so a failed catch-up is not the
    /// append's failure; the next poll reports it again.
    async fn catch_up_after_append(&self) {
        if !self.options.catch_up_on_append {
            return;
        }
        if let Err(e) = self.poll().await {
            warn!(log = self.store.name(), error = %e, "mirror: catch-up after append failed");
        }
    }
}

impl<S: Schema, L: LogStore> MirrorReader<S::Record> for SyncEngine<S, L> {
    fn snapshot(&self) -> MirrorView<S::Record> {
        self.mirror.snapshot()
    }

    fn len(&self) -> usize {
        self.mirror.len()
    }

    fn frontier(&self) -> Seq {
        self.mirror.frontier()
    }

    fn subscribe(&self) -> LiveTail<S::Record> {
        self.mirror.subscribe()
    }

    fn fold<A, F>(&self, init: A, f: F) -> A
    where
        F: FnMut(A, &Row<S::Record>) -> A,
    {
        self.mirror.fold(init, f)
    }
}

/// Validates a read-back batch in full; the first failure rejects all of it.
fn validate_batch<S: Schema>(schema: &S, raw: Vec<RawRow>) -> Result<Vec<Row<S::Record>>, ValidationError> {
    raw.into_iter()
        .map(|row| {
            schema
                .validate(&row.data)
                .map(|data| Row { seq: row.seq, data })
                .map_err(|e| e.at_row(row.seq))
        })
        .collect()
}
