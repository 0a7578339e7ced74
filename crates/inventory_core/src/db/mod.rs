//! SQLite storage engine for inventory items.
//!
//! # Responsibility
//! - Open and configure SQLite connections (file or in-memory).
//! - Apply the `items` schema before any data access.
//! - Run SQL off the async executor and broadcast table changes.
//! - Own the process-wide database handle.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write item data before the schema is applied.
//! - Every committed write that changed rows is announced to observers of
//!   the written table, in commit order.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod config;
pub mod database;
pub mod invalidation;
pub mod migrations;
mod open;
pub mod store;

pub use config::{ConflictPolicy, StoreConfig, StoreLocation, DATABASE_NAME};
pub use database::{get_database, get_database_async, DatabaseContext, InventoryDatabase};
pub use invalidation::InvalidationTracker;
pub use open::{open_db, open_db_in_memory};
pub use store::{ItemStore, ITEMS_TABLE};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Schema creation or migration failed. Callers should treat this as fatal.
    Schema(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    Sqlite(rusqlite::Error),
    /// SQLite refused to release the connection; the store stays open.
    Close(rusqlite::Error),
    Io(std::io::Error),
    NotOpen,
    AlreadyInitialized {
        existing: PathBuf,
        requested: PathBuf,
    },
    Poisoned,
    Background(String),
}

impl DbError {
    /// Returns whether this error came from schema setup.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::Schema(_) | Self::UnsupportedSchemaVersion { .. }
        )
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Schema(err) => write!(f, "schema setup failed: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Close(err) => write!(f, "failed to close database: {err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::NotOpen => write!(f, "item store is not open"),
            Self::AlreadyInitialized {
                existing,
                requested,
            } => write!(
                f,
                "database already initialized at `{}`; refusing to switch to `{}`",
                existing.display(),
                requested.display()
            ),
            Self::Poisoned => write!(f, "item store connection lock is poisoned"),
            Self::Background(message) => write!(f, "background database task failed: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Schema(err) | Self::Sqlite(err) | Self::Close(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::NotOpen
            | Self::AlreadyInitialized { .. }
            | Self::Poisoned
            | Self::Background(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for DbError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
