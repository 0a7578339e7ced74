//! Store configuration values.
//!
//! Plain serde types so hosts can embed them in their own settings files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the durable item database inside the host data directory.
pub const DATABASE_NAME: &str = "item_database";

/// Where the item store keeps its rows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum StoreLocation {
    /// Non-persistent store; contents disappear with the handle.
    #[default]
    InMemory,
    File(PathBuf),
}

impl StoreLocation {
    pub fn mode(&self) -> &'static str {
        match self {
            Self::InMemory => "memory",
            Self::File(_) => "file",
        }
    }
}

/// Rule applied when an inserted item's id already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Overwrite the existing row.
    #[default]
    Replace,
    /// Keep the existing row and drop the new write.
    Ignore,
    /// Reject the write with a constraint violation.
    Abort,
}

impl ConflictPolicy {
    /// Insert statement for this policy.
    ///
    /// Only an `id` collision is resolved by the policy; every other
    /// constraint failure aborts the statement.
    pub(crate) fn insert_sql(self) -> &'static str {
        match self {
            Self::Replace => {
                "INSERT INTO items (id, name, price, quantity) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    price = excluded.price,
                    quantity = excluded.quantity;"
            }
            Self::Ignore => {
                "INSERT INTO items (id, name, price, quantity) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO NOTHING;"
            }
            Self::Abort => "INSERT INTO items (id, name, price, quantity) VALUES (?1, ?2, ?3, ?4);",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub location: StoreLocation,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            conflict_policy: ConflictPolicy::default(),
        }
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }
}
