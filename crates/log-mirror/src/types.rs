//! Core types for the log mirror.

use serde::{Deserialize, Serialize};

/// A store-assigned sequence number.
///
/// Assigned exclusively by the log store; `Seq::ZERO` is the frontier of an
/// empty mirror and never names a real row.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seq(pub i64);

impl Seq {
    /// The frontier of a mirror that has observed nothing.
    pub const ZERO: Seq = Seq(0);

    /// Returns the raw integer value.
    pub fn value(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Seq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Seq {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A validated record together with its store-assigned seq.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Row<T> {
    pub seq: Seq,
    pub data: T,
}

impl<T> Row<T> {
    /// Creates a row.
    pub fn new(seq: impl Into<Seq>, data: T) -> Self {
        Self {
            seq: seq.into(),
            data,
        }
    }
}

/// A row as read back from the store, before the schema gate.
#[derive(Clone, Debug, PartialEq)]
pub struct RawRow {
    pub seq: Seq,
    pub data: serde_json::Value,
}
