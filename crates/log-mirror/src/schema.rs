//! Schema gate for the log mirror.
//!
//! Every payload crosses the gate twice: on the way into the store (before
//! any write) and on the way back out (before it reaches the mirror). A row
//! that another writer stored without this gate is therefore still rejected
//! on read-back.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::types::Seq;

/// One field-level problem found by a schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldIssue {
    /// JSON-path style location, `$` for the payload root.
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    /// Creates an issue at the given path.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A payload did not match the expected schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    /// The offending row, when the failure happened on read-back.
    seq: Option<Seq>,
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Creates a validation error from a list of issues.
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { seq: None, issues }
    }

    /// Creates a validation error with a single issue.
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldIssue::new(path, message)])
    }

    /// Attaches the seq of the stored row that failed.
    pub fn at_row(mut self, seq: Seq) -> Self {
        self.seq = Some(seq);
        self
    }

    /// The seq of the failing row, if the failure happened on read-back.
    pub fn seq(&self) -> Option<Seq> {
        self.seq
    }

    /// The individual field issues.
    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.seq {
            Some(seq) => write!(f, "row {} failed validation", seq)?,
            None => write!(f, "record failed validation")?,
        }
        for (i, issue) in self.issues.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Converts untyped payloads into typed records, or rejects them.
pub trait Schema: Send + Sync + 'static {
    /// The typed record this schema produces.
    type Record: Clone + Send + Sync + 'static;

    /// Validates and coerces a decoded payload.
    fn validate(&self, raw: &Value) -> Result<Self::Record, ValidationError>;

    /// Encodes a record into the payload shape the store persists.
    fn encode(&self, record: &Self::Record) -> Result<Value, ValidationError>;

    /// Runs a record through the outbound gate.
    ///
    /// The record is encoded and the encoding validated, so refinements that
    /// the Rust type alone cannot express are enforced before any write.
    /// Returns the payload to persist and the coerced record.
    fn admit(&self, record: &Self::Record) -> Result<(Value, Self::Record), ValidationError> {
        let payload = self.encode(record)?;
        let coerced = self.validate(&payload)?;
        Ok((payload, coerced))
    }
}

type Check<T> = Box<dyn Fn(&T) -> Result<(), FieldIssue> + Send + Sync>;

/// A schema backed by a serde type, with optional refinement checks.
///
/// Shape and types are enforced by `T`'s `Deserialize` impl; refinements add
/// constraints such as ranges and report them with a field path.
///
/// ```
/// use log_mirror::{FieldIssue, JsonSchema, Schema};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Reading {
///     value: i64,
/// }
///
/// let schema = JsonSchema::<Reading>::new().check(|r| {
///     if r.value >= 0 {
///         Ok(())
///     } else {
///         Err(FieldIssue::new("$.value", "must be non-negative"))
///     }
/// });
///
/// assert!(schema.validate(&serde_json::json!({"value": 3})).is_ok());
/// assert!(schema.validate(&serde_json::json!({"value": -1})).is_err());
/// assert!(schema.validate(&serde_json::json!({"value": "3"})).is_err());
/// ```
pub struct JsonSchema<T> {
    checks: Vec<Check<T>>,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonSchema<T> {
    /// Creates a schema with no refinements.
    pub fn new() -> Self {
        Self {
            checks: Vec::new(),
            _record: PhantomData,
        }
    }

    /// Adds a refinement check.
    pub fn check<F>(mut self, check: F) -> Self
    where
        F: Fn(&T) -> Result<(), FieldIssue> + Send + Sync + 'static,
    {
        self.checks.push(Box::new(check));
        self
    }
}

impl<T> Default for JsonSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema for JsonSchema<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Record = T;

    fn validate(&self, raw: &Value) -> Result<T, ValidationError> {
        let record: T = T::deserialize(raw).map_err(|e| ValidationError::single("$", e.to_string()))?;

        let issues: Vec<FieldIssue> = self.checks.iter().filter_map(|check| check(&record).err()).collect();
        if !issues.is_empty() {
            return Err(ValidationError::new(issues));
        }
        Ok(record)
    }

    fn encode(&self, record: &T) -> Result<Value, ValidationError> {
        serde_json::to_value(record).map_err(|e| ValidationError::single("$", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Reading {
        value: i64,
    }

    fn bounded() -> JsonSchema<Reading> {
        JsonSchema::<Reading>::new()
            .check(|r| {
                if r.value >= 0 {
                    Ok(())
                } else {
                    Err(FieldIssue::new("$.value", "must be non-negative"))
                }
            })
            .check(|r| {
                if r.value < 1_000 {
                    Ok(())
                } else {
                    Err(FieldIssue::new("$.value", "must be below 1000"))
                }
            })
    }

    #[test]
    fn accepts_conforming_payload() {
        let schema = JsonSchema::<Reading>::new();
        assert_eq!(schema.validate(&json!({"value": 42})).unwrap(), Reading { value: 42 });
    }

    #[test]
    fn rejects_wrong_type() {
        let schema = JsonSchema::<Reading>::new();
        let err = schema.validate(&json!({"value": "42"})).unwrap_err();

        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].path, "$");
        assert!(err.issues()[0].message.contains("invalid type"));
        assert_eq!(err.seq(), None);
    }

    #[test]
    fn rejects_missing_field() {
        let schema = JsonSchema::<Reading>::new();
        let err = schema.validate(&json!({})).unwrap_err();
        assert!(err.to_string().contains("missing field `value`"));
    }

    #[test]
    fn refinements_report_field_paths() {
        let err = bounded().validate(&json!({"value": -5})).unwrap_err();
        assert_eq!(err.issues(), &[FieldIssue::new("$.value", "must be non-negative")]);
    }

    #[test]
    fn admit_enforces_refinements_before_write() {
        let schema = bounded();
        assert!(schema.admit(&Reading { value: 5000 }).is_err());

        let (payload, record) = schema.admit(&Reading { value: 7 }).unwrap();
        assert_eq!(payload, json!({"value": 7}));
        assert_eq!(record, Reading { value: 7 });
    }

    #[test]
    fn display_includes_row_and_issues() {
        let err = ValidationError::new(vec![
            FieldIssue::new("$.a", "bad"),
            FieldIssue::new("$.b", "worse"),
        ])
        .at_row(Seq(9));

        assert_eq!(err.to_string(), "row 9 failed validation: $.a: bad; $.b: worse");
    }
}
