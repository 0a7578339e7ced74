//! Repository layer over the item store.
//!
//! # Responsibility
//! - Define the item data-access contract used by services and hosts.
//! - Isolate SQLite query details from use-case orchestration.
//!
//! # Invariants
//! - Repository reads are live streams, never cached values.
//! - Store failures surface as `RepoError::Db`; nothing is retried here.

pub mod item_repo;
