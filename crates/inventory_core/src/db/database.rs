//! Database handle and the process-wide instance.
//!
//! # Responsibility
//! - Bundle the item store with its configuration.
//! - Hand out repositories bound to that store.
//! - Provide exactly one durable handle per process via [`get_database`].
//!
//! # Invariants
//! - The global handle is constructed at most once, even under concurrent
//!   first access.
//! - The global handle never silently switches to a different directory.

use super::config::{StoreConfig, StoreLocation, DATABASE_NAME};
use super::store::ItemStore;
use super::{DbError, DbResult};
use crate::repo::item_repo::SqliteItemRepository;
use log::info;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

static DATABASE: OnceCell<InventoryDatabase> = OnceCell::new();

/// Host-provided environment needed to locate the durable database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseContext {
    data_dir: PathBuf,
}

impl DatabaseContext {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full path of the `item_database` file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_NAME)
    }
}

/// Opened inventory database.
#[derive(Debug, Clone)]
pub struct InventoryDatabase {
    store: ItemStore,
    config: StoreConfig,
}

impl InventoryDatabase {
    /// Opens a database that is not shared through the global instance.
    ///
    /// Used by tests (in-memory) and by hosts that inject the handle themselves.
    pub fn open(config: StoreConfig) -> DbResult<Self> {
        let store = ItemStore::open(config.location.clone())?;
        Ok(Self { store, config })
    }

    pub fn in_memory() -> DbResult<Self> {
        Self::open(StoreConfig::in_memory())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    /// Returns the item repository bound to this database.
    pub fn item_dao(&self) -> SqliteItemRepository {
        SqliteItemRepository::with_conflict_policy(self.store.clone(), self.config.conflict_policy)
    }

    pub fn is_open(&self) -> bool {
        self.store.is_open()
    }

    pub async fn close(&self) -> DbResult<()> {
        self.store.close().await
    }
}

/// Returns the process-wide durable database, opening it on first use.
///
/// The first call opens the file and applies the schema on the calling
/// thread. Hosts with a latency-sensitive thread should call it elsewhere or
/// use [`get_database_async`].
///
/// # Errors
/// - `Io` when the data directory cannot be created.
/// - Any open/schema error from the first construction; a later call retries.
/// - `AlreadyInitialized` when the instance lives in a different directory.
pub fn get_database(context: &DatabaseContext) -> DbResult<&'static InventoryDatabase> {
    let requested = context.database_path();
    let database = DATABASE.get_or_try_init(|| -> DbResult<InventoryDatabase> {
        std::fs::create_dir_all(context.data_dir())?;
        let database = InventoryDatabase::open(StoreConfig::file(requested.clone()))?;
        info!(
            "event=database_init module=db status=ok path={}",
            requested.display()
        );
        Ok(database)
    })?;

    match &database.config.location {
        StoreLocation::File(existing) if *existing == requested => Ok(database),
        StoreLocation::File(existing) => Err(DbError::AlreadyInitialized {
            existing: existing.clone(),
            requested,
        }),
        StoreLocation::InMemory => Err(DbError::AlreadyInitialized {
            existing: PathBuf::from(":memory:"),
            requested,
        }),
    }
}

/// Same as [`get_database`], with the open running on tokio's blocking pool.
pub async fn get_database_async(context: DatabaseContext) -> DbResult<&'static InventoryDatabase> {
    tokio::task::spawn_blocking(move || get_database(&context))
        .await
        .map_err(|err| DbError::Background(err.to_string()))?
}
