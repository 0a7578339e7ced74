//! Domain model for the inventory data layer.
//!
//! # Responsibility
//! - Define the records persisted by the item store.
//!
//! # Invariants
//! - Every stored record is identified by a caller-assigned `ItemId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod item;
