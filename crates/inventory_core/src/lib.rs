//! Inventory data layer.
//! One persisted `Item` entity, a SQLite-backed store with live queries,
//! and the repository/service APIs hosts call into.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{
    get_database, get_database_async, ConflictPolicy, DatabaseContext, DbError, DbResult,
    InventoryDatabase, ItemStore, StoreConfig, StoreLocation,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::item::{Item, ItemId, ItemValidationError};
pub use repo::item_repo::{
    first_snapshot, ItemRepository, ItemStream, RepoError, RepoResult, SqliteItemRepository,
};
pub use service::inventory_service::InventoryService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
