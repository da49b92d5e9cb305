//! The operations a resource rule answers, and how HTTP verbs map onto them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the standard rule operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    GetCollection,
    GetItem,
    AddItem,
    ReplaceCollection,
    ReplaceItem,
    ExtendCollection,
    ExtendItem,
    DeleteCollection,
    DeleteItem,
}

impl Operation {
    /// Map a request method onto an operation.
    ///
    /// `has_id` tells whether the path carried an item id. Returns `None` for
    /// methods a rule does not support.
    pub fn resolve(method: &str, has_id: bool) -> Option<Self> {
        let op = match (method, has_id) {
            ("GET" | "HEAD", true) => Operation::GetItem,
            ("GET" | "HEAD", false) => Operation::GetCollection,
            ("POST", _) => Operation::AddItem,
            ("PUT", true) => Operation::ReplaceItem,
            ("PUT", false) => Operation::ReplaceCollection,
            ("PATCH", true) => Operation::ExtendItem,
            ("PATCH", false) => Operation::ExtendCollection,
            ("DELETE", true) => Operation::DeleteItem,
            ("DELETE", false) => Operation::DeleteCollection,
            _ => return None,
        };
        Some(op)
    }

    /// Whether the operation consumes a request body.
    pub fn reads_body(&self) -> bool {
        matches!(
            self,
            Operation::AddItem
                | Operation::ReplaceCollection
                | Operation::ReplaceItem
                | Operation::ExtendCollection
                | Operation::ExtendItem
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::GetCollection => "getCollection",
            Operation::GetItem => "getItem",
            Operation::AddItem => "addItem",
            Operation::ReplaceCollection => "replaceCollection",
            Operation::ReplaceItem => "replaceItem",
            Operation::ExtendCollection => "extendCollection",
            Operation::ExtendItem => "extendItem",
            Operation::DeleteCollection => "deleteCollection",
            Operation::DeleteItem => "deleteItem",
        };
        f.write_str(name)
    }
}
