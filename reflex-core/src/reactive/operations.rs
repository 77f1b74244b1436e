//! The closed set of operations the engine tracks and triggers.

use std::fmt;

use serde::Serialize;

/// A tracked read (`Get`, `Has`, `Iterate`) or a triggered write (`Add`,
/// `Set`, `Delete`, `Clear`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Get,
    Has,
    Iterate,
    Add,
    Set,
    Delete,
    Clear,
}

impl OperationType {
    /// Whether this operation changes the number of keys on its target.
    pub fn changes_key_count(self) -> bool {
        matches!(self, OperationType::Add | OperationType::Delete)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationType::Get => "Get",
            OperationType::Has => "Has",
            OperationType::Iterate => "Iterate",
            OperationType::Add => "Add",
            OperationType::Set => "Set",
            OperationType::Delete => "Delete",
            OperationType::Clear => "Clear",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_add_and_delete_change_key_count() {
        assert!(OperationType::Add.changes_key_count());
        assert!(OperationType::Delete.changes_key_count());
        assert!(!OperationType::Set.changes_key_count());
        assert!(!OperationType::Clear.changes_key_count());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&OperationType::Iterate).unwrap(),
            "\"iterate\""
        );
    }
}
