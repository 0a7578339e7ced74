//! Item store: one SQLite connection shared by every repository call.
//!
//! # Responsibility
//! - Own the connection and its open/closed lifecycle.
//! - Run SQL on tokio's blocking pool so async callers never block a worker.
//! - Announce committed writes through the [`InvalidationTracker`].
//!
//! # Invariants
//! - All SQL is serialized through one mutex; writes are applied one at a time.
//! - A write is announced while the connection lock is still held, so
//!   observers receive notifications in commit order.
//! - After `close()` every operation fails with `DbError::NotOpen`.

use super::invalidation::InvalidationTracker;
use super::migrations::apply_migrations;
use super::open::open_location;
use super::{DbError, DbResult, StoreLocation};
use log::{error, info};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Name of the single table owned by the store.
pub const ITEMS_TABLE: &str = "items";

/// Cloneable handle to an opened item store.
#[derive(Debug, Clone)]
pub struct ItemStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    conn: Mutex<Option<Connection>>,
    location: StoreLocation,
    tracker: InvalidationTracker,
}

impl ItemStore {
    /// Opens the store at `location` and applies the schema.
    ///
    /// # Errors
    /// - `Schema`/`UnsupportedSchemaVersion` when the schema cannot be applied.
    /// - `Sqlite` when the file cannot be opened.
    pub fn open(location: StoreLocation) -> DbResult<Self> {
        let conn = open_location(&location)?;
        Ok(Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(Some(conn)),
                location,
                tracker: InvalidationTracker::new(),
            }),
        })
    }

    pub fn location(&self) -> &StoreLocation {
        &self.inner.location
    }

    pub fn is_open(&self) -> bool {
        self.inner
            .conn
            .lock()
            .map(|conn| conn.is_some())
            .unwrap_or(false)
    }

    /// Ensures the `items` table exists. Safe to call any number of times.
    pub async fn create_schema(&self) -> DbResult<()> {
        self.run(apply_migrations).await
    }

    /// Runs `f` against the connection on the blocking pool.
    pub async fn run<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Connection) -> Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: From<DbError> + Send + 'static,
    {
        self.with_connection(move |_, conn| f(conn)).await
    }

    /// Runs a mutation of `table` and announces it when rows changed.
    ///
    /// `f` returns the number of changed rows.
    pub async fn write<F, E>(&self, table: &'static str, f: F) -> Result<usize, E>
    where
        F: FnOnce(&mut Connection) -> Result<usize, E> + Send + 'static,
        E: From<DbError> + Send + 'static,
    {
        self.with_connection(move |inner, conn| {
            let changed = f(conn)?;
            if changed > 0 {
                inner.tracker.notify(table);
            }
            Ok(changed)
        })
        .await
    }

    /// Registers a change observer for `table`.
    pub fn subscribe(&self, table: &'static str) -> broadcast::Receiver<u64> {
        self.inner.tracker.subscribe(table)
    }

    pub fn observer_count(&self, table: &'static str) -> usize {
        self.inner.tracker.observer_count(table)
    }

    /// Releases the connection and ends every live observer.
    ///
    /// Closing an already closed store is a no-op.
    ///
    /// # Errors
    /// - `Close` when SQLite refuses to release the connection. The store is
    ///   left open so the caller can retry.
    pub async fn close(&self) -> DbResult<()> {
        let inner = Arc::clone(&self.inner);
        let mode = inner.location.mode();
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.conn.lock().map_err(|_| DbError::Poisoned)?;
            let Some(conn) = guard.take() else {
                return Ok(());
            };

            match conn.close() {
                Ok(()) => {
                    inner.tracker.close();
                    info!("event=db_close module=db status=ok mode={mode}");
                    Ok(())
                }
                Err((conn, err)) => {
                    *guard = Some(conn);
                    error!(
                        "event=db_close module=db status=error mode={mode} error_code=db_close_failed error={err}"
                    );
                    Err(DbError::Close(err))
                }
            }
        })
        .await
        .map_err(|err| DbError::Background(err.to_string()))?
    }

    async fn with_connection<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&StoreInner, &mut Connection) -> Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: From<DbError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.conn.lock().map_err(|_| DbError::Poisoned)?;
            let conn = guard.as_mut().ok_or(DbError::NotOpen)?;
            f(inner.as_ref(), conn)
        })
        .await
        .map_err(|err| E::from(DbError::Background(err.to_string())))?
    }
}

#[cfg(test)]
mod tests {
    use super::{ItemStore, ITEMS_TABLE};
    use crate::db::{DbError, StoreLocation};

    fn count_items(conn: &mut rusqlite::Connection) -> Result<i64, DbError> {
        Ok(conn.query_row("SELECT COUNT(*) FROM items;", [], |row| row.get(0))?)
    }

    #[tokio::test]
    async fn open_in_memory_creates_items_table() {
        let store = ItemStore::open(StoreLocation::InMemory).unwrap();
        assert!(store.is_open());
        assert_eq!(store.run(count_items).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn create_schema_is_idempotent() {
        let store = ItemStore::open(StoreLocation::InMemory).unwrap();
        store.create_schema().await.unwrap();
        store.create_schema().await.unwrap();
        assert_eq!(store.run(count_items).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn write_notifies_only_when_rows_changed() {
        let store = ItemStore::open(StoreLocation::InMemory).unwrap();
        let mut rx = store.subscribe(ITEMS_TABLE);

        let unchanged = store
            .write(ITEMS_TABLE, |conn| {
                Ok::<_, DbError>(conn.execute("DELETE FROM items WHERE id = 42;", [])?)
            })
            .await
            .unwrap();
        assert_eq!(unchanged, 0);
        assert!(rx.try_recv().is_err());

        let changed = store
            .write(ITEMS_TABLE, |conn| {
                Ok::<_, DbError>(conn.execute(
                    "INSERT INTO items (id, name, price, quantity) VALUES (1, 'Apples', 1.0, 1);",
                    [],
                )?)
            })
            .await
            .unwrap();
        assert_eq!(changed, 1);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn operations_after_close_fail_with_not_open() {
        let store = ItemStore::open(StoreLocation::InMemory).unwrap();
        store.close().await.unwrap();

        assert!(!store.is_open());
        let err = store.run(count_items).await.unwrap_err();
        assert!(matches!(err, DbError::NotOpen));
        let err = store.create_schema().await.unwrap_err();
        assert!(matches!(err, DbError::NotOpen));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_ends_observers() {
        let store = ItemStore::open(StoreLocation::InMemory).unwrap();
        let mut rx = store.subscribe(ITEMS_TABLE);

        store.close().await.unwrap();
        store.close().await.unwrap();

        assert!(rx.recv().await.is_err());
        assert_eq!(store.observer_count(ITEMS_TABLE), 0);
    }
}
