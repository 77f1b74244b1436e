//! Error types.
//!
//! The engine itself degrades silently instead of failing: a refused wrap
//! returns its input, a mutation through a locked read-only view is dropped.
//! These enums describe those situations so they can be logged in
//! development builds, and surface through the few fallible entry points
//! (`TryFrom<Value>` conversions, [`Observed::try_set`] and
//! [`Observed::try_delete`]).
//!
//! [`Observed::try_set`]: crate::reactive::Observed::try_set
//! [`Observed::try_delete`]: crate::reactive::Observed::try_delete

use thiserror::Error;

use crate::reactive::OperationType;

/// Failure to convert a [`Value`](crate::Value) into a Rust type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The value had a different runtime type than requested.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// A reactivity operation that was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactivityError {
    /// A mutation was attempted through a read-only view while the lock was
    /// engaged.
    #[error("{op} operation{} failed: target is readonly", key_suffix(.key))]
    ReadonlyMutation {
        op: OperationType,
        key: Option<String>,
    },

    /// Only object-like values can be observed.
    #[error("value cannot be made reactive: {value}")]
    NotObservable { value: String },
}

fn key_suffix(key: &Option<String>) -> String {
    match key {
        Some(key) => format!(" on key \"{key}\""),
        None => String::new(),
    }
}
