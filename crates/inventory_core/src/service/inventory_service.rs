//! Inventory use-case service.
//!
//! # Responsibility
//! - Provide validated write entry points for host callers.
//! - Implement stock adjustments on top of repository primitives.
//!
//! # Invariants
//! - Writes through this service always pass `Item::validate()`.
//! - Service layer remains storage-agnostic.

use crate::model::item::{Item, ItemId, ItemValidationError};
use crate::repo::item_repo::{first_snapshot, ItemRepository, ItemStream, RepoError, RepoResult};
use log::info;

/// Use-case service wrapper for item operations.
pub struct InventoryService<R: ItemRepository> {
    repo: R,
}

impl<R: ItemRepository> InventoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates and inserts a new item.
    pub async fn add_item(&self, item: &Item) -> RepoResult<()> {
        item.validate()?;
        self.repo.insert(item).await
    }

    /// Validates and replaces an existing item.
    pub async fn update_item(&self, item: &Item) -> RepoResult<()> {
        item.validate()?;
        self.repo.update(item).await
    }

    pub async fn remove_item(&self, item: &Item) -> RepoResult<()> {
        self.repo.delete(item).await
    }

    /// Current stored version of `id`, if any.
    pub async fn find_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        Ok(first_snapshot(self.repo.get_item(id)).await?.into_iter().next())
    }

    /// Sells one unit of `id` and returns the updated item.
    ///
    /// # Contract
    /// - Fails with `NotFound` when the item does not exist.
    /// - Fails with `Validation(OutOfStock)` when quantity is zero or less.
    /// - Read and write are separate store operations; concurrent sellers of
    ///   the same item are not coordinated.
    pub async fn sell_one(&self, id: ItemId) -> RepoResult<Item> {
        let mut item = self.find_item(id).await?.ok_or(RepoError::NotFound(id))?;
        if !item.is_in_stock() {
            return Err(ItemValidationError::OutOfStock(id).into());
        }

        item.quantity -= 1;
        self.repo.update(&item).await?;
        info!(
            "event=item_sold module=service status=ok id={id} remaining={}",
            item.quantity
        );
        Ok(item)
    }

    pub async fn is_in_stock(&self, id: ItemId) -> RepoResult<bool> {
        Ok(self
            .find_item(id)
            .await?
            .is_some_and(|item| item.is_in_stock()))
    }

    pub fn items(&self) -> ItemStream {
        self.repo.get_all_items()
    }

    pub fn item(&self, id: ItemId) -> ItemStream {
        self.repo.get_item(id)
    }
}
