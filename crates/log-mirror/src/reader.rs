//! Read-side trait for mirrors.
//!
//! Reads are pure, derived, and fast.
//!
//! # Design Principles
//!
//! - Reads never hit SQLite
//! - Reads never advance the frontier
//! - All read state is produced by the initial load and by polls

use crate::live::LiveTail;
use crate::mirror::{Mirror, MirrorView};
use crate::types::{Row, Seq};

/// A reader for mirrored rows.
pub trait MirrorReader<T> {
    /// Returns an immutable snapshot of every mirrored row.
    fn snapshot(&self) -> MirrorView<T>;

    /// Returns the number of mirrored rows.
    fn len(&self) -> usize;

    /// Returns true if nothing has been mirrored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the highest mirrored seq, or `Seq::ZERO`.
    fn frontier(&self) -> Seq;

    /// Subscribes to batches appended from now on.
    fn subscribe(&self) -> LiveTail<T>;

    /// Folds over the mirrored rows in seq order.
    fn fold<A, F>(&self, init: A, f: F) -> A
    where
        F: FnMut(A, &Row<T>) -> A;
}

impl<T: Clone> MirrorReader<T> for Mirror<T> {
    fn snapshot(&self) -> MirrorView<T> {
        Mirror::snapshot(self)
    }

    fn len(&self) -> usize {
        Mirror::len(self)
    }

    fn frontier(&self) -> Seq {
        Mirror::frontier(self)
    }

    fn subscribe(&self) -> LiveTail<T> {
        Mirror::subscribe(self)
    }

    fn fold<A, F>(&self, init: A, f: F) -> A
    where
        F: FnMut(A, &Row<T>) -> A,
    {
        Mirror::fold(self, init, f)
    }
}
