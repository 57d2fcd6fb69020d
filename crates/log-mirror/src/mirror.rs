//! The in-memory mirror of a log.
//!
//! The mirror is what the computation engine reads. It holds a gap-free,
//! ascending prefix of the store's rows, bounded by its frontier, and only ever
//! grows.
//!
//! # Design Principles
//!
//! - Rows enter only through the initial load and `Mirror::push`, both driven
//!   by the sync engine
//! - A push is checked in full before anything is applied
//! - Rows at or below the frontier are already mirrored and are dropped
//! - Reads are pure projections and never touch the store

use std::sync::RwLock;

use crate::live::{LiveHub, LiveTail};
use crate::types::{Row, Seq};
use crate::SyncError;

/// Floor for batches that may overlap the frontier.
const NO_FLOOR: Seq = Seq(i64::MIN);

/// An immutable snapshot of a mirror.
#[derive(Debug, Clone)]
pub struct MirrorView<T> {
    rows: Vec<Row<T>>,
    frontier: Seq,
}

impl<T> MirrorView<T> {
    /// Returns a borrowing iterator over the rows.
    pub fn iter(&self) -> impl Iterator<Item = &Row<T>> {
        self.rows.iter()
    }

    /// Returns a borrowing iterator over the records only.
    pub fn records(&self) -> impl Iterator<Item = &T> {
        self.rows.iter().map(|row| &row.data)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The highest seq in this snapshot, or `Seq::ZERO`.
    pub fn frontier(&self) -> Seq {
        self.frontier
    }

    /// Returns the row at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Row<T>> {
        self.rows.get(index)
    }

    /// Returns the rows as a slice.
    pub fn rows(&self) -> &[Row<T>] {
        &self.rows
    }
}

impl<T> std::ops::Index<usize> for MirrorView<T> {
    type Output = Row<T>;

    fn index(&self, index: usize) -> &Row<T> {
        &self.rows[index]
    }
}

impl<T> IntoIterator for MirrorView<T> {
    type Item = Row<T>;
    type IntoIter = std::vec::IntoIter<Row<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

#[derive(Debug)]
struct MirrorState<T> {
    rows: Vec<Row<T>>,
    frontier: Seq,
}

/// An ordered, append-only, in-memory mirror of a log.
///
/// Reads may happen from any task. Only the owning sync engine extends it,
/// from rows it read back from the store:
///
/// ```compile_fail
/// use log_mirror::{Mirror, Row, Seq};
///
/// let mirror = Mirror::<i64>::new();
/// mirror.push(vec![Row::new(Seq(3), 3)]).unwrap();
/// ```
#[derive(Debug)]
pub struct Mirror<T> {
    state: RwLock<MirrorState<T>>,
    live: LiveHub<T>,
}

impl<T: Clone> Mirror<T> {
    /// Creates an empty mirror.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MirrorState {
                rows: Vec::new(),
                frontier: Seq::ZERO,
            }),
            live: LiveHub::new(),
        }
    }

    /// Creates a mirror from an initial load.
    ///
    /// The rows must be strictly ascending by seq. Live tails are not fed.
    pub fn from_rows(rows: Vec<Row<T>>) -> Result<Self, SyncError> {
        check_ascending(Seq::ZERO, &rows)?;
        let frontier = rows.last().map(|row| row.seq).unwrap_or(Seq::ZERO);
        Ok(Self {
            state: RwLock::new(MirrorState { rows, frontier }),
            live: LiveHub::new(),
        })
    }

    /// Extends the mirror with a batch in ascending seq order.
    ///
    /// Rows at or below the frontier are dropped as already mirrored. The
    /// whole batch is checked before anything is applied; a batch that is not
    /// strictly ascending is rejected and leaves the mirror untouched.
    ///
    /// Returns the number of rows appended.
    pub(crate) fn push(&self, batch: Vec<Row<T>>) -> Result<usize, SyncError> {
        check_ascending(NO_FLOOR, &batch)?;

        let fresh: Vec<Row<T>> = {
            let mut state = self.state.write().expect("lock poisoned");
            let frontier = state.frontier;
            let fresh: Vec<Row<T>> = batch.into_iter().filter(|row| row.seq > frontier).collect();
            if fresh.is_empty() {
                return Ok(0);
            }

            state.frontier = fresh[fresh.len() - 1].seq;
            state.rows.extend(fresh.iter().cloned());
            fresh
        };

        self.live.notify(&fresh);
        Ok(fresh.len())
    }

    /// Returns an immutable snapshot.
    pub fn snapshot(&self) -> MirrorView<T> {
        let state = self.state.read().expect("lock poisoned");
        MirrorView {
            rows: state.rows.clone(),
            frontier: state.frontier,
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().expect("lock poisoned").rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The highest seq mirrored, or `Seq::ZERO` when empty.
    pub fn frontier(&self) -> Seq {
        self.state.read().expect("lock poisoned").frontier
    }

    /// Folds over the mirrored rows in seq order without copying them.
    pub fn fold<A, F>(&self, init: A, f: F) -> A
    where
        F: FnMut(A, &Row<T>) -> A,
    {
        self.state.read().expect("lock poisoned").rows.iter().fold(init, f)
    }

    /// Subscribes to batches appended from now on.
    pub fn subscribe(&self) -> LiveTail<T> {
        self.live.subscribe()
    }
}

impl<T: Clone> Default for Mirror<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Every row must be strictly greater than its predecessor (and than `floor`).
fn check_ascending<T>(floor: Seq, rows: &[Row<T>]) -> Result<(), SyncError> {
    let mut previous = floor;
    for row in rows {
        if row.seq <= previous {
            return Err(SyncError::OutOfOrder {
                previous,
                next: row.seq,
            });
        }
        previous = row.seq;
    }
    Ok(())
}
