//! Item repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/update/delete/lookup/scan over the `items` table.
//! - Turn reads into live streams that re-run after every committed write.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - The repository caches nothing; every snapshot is read from the store.
//! - `update` replaces every column of the row with the item's id.
//! - `delete` removes a row only when all four columns match.
//! - A stream's first snapshot is the state at subscription time.

use crate::db::{ConflictPolicy, DbError, ItemStore, ITEMS_TABLE};
use crate::model::item::{Item, ItemId, ItemValidationError};
use async_trait::async_trait;
use log::debug;
use rusqlite::{params, Connection, Params, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::pin::Pin;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_stream::{Stream, StreamExt};

const ITEM_BY_ID_SQL: &str = "SELECT id, name, price, quantity FROM items WHERE id = ?1;";
const ALL_ITEMS_SQL: &str = "SELECT id, name, price, quantity FROM items ORDER BY name ASC, id ASC;";

pub type RepoResult<T> = Result<T, RepoError>;

/// Live sequence of query snapshots.
///
/// Never ends while the store is open; drop it to unsubscribe. After a
/// failed snapshot is yielded the stream ends.
pub type ItemStream = Pin<Box<dyn Stream<Item = RepoResult<Vec<Item>>> + Send>>;

/// Error for item persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Insert collided with an existing id under `ConflictPolicy::Abort`.
    ConstraintViolation { id: ItemId },
    NotFound(ItemId),
    Validation(ItemValidationError),
    InvalidData(String),
}

impl RepoError {
    pub fn is_not_open(&self) -> bool {
        matches!(self, Self::Db(DbError::NotOpen))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ConstraintViolation { id } => write!(f, "item with id {id} already exists"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::ConstraintViolation { .. } | Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Repository interface for item CRUD operations.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Writes a new row; id collisions follow the repository's conflict policy.
    async fn insert(&self, item: &Item) -> RepoResult<()>;
    /// Replaces the row with `item.id`. No-op when that id is absent.
    async fn update(&self, item: &Item) -> RepoResult<()>;
    /// Removes the row equal to `item` in every field. No-op when none matches.
    async fn delete(&self, item: &Item) -> RepoResult<()>;
    /// Live snapshots holding the item with `id`, or nothing.
    fn get_item(&self, id: ItemId) -> ItemStream;
    /// Live snapshots of the whole table ordered by name.
    fn get_all_items(&self) -> ItemStream;
}

/// SQLite-backed item repository.
#[derive(Debug, Clone)]
pub struct SqliteItemRepository {
    store: ItemStore,
    conflict_policy: ConflictPolicy,
}

impl SqliteItemRepository {
    pub fn new(store: ItemStore) -> Self {
        Self::with_conflict_policy(store, ConflictPolicy::default())
    }

    pub fn with_conflict_policy(store: ItemStore, conflict_policy: ConflictPolicy) -> Self {
        Self {
            store,
            conflict_policy,
        }
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.conflict_policy
    }

    fn observe<Q>(&self, query: Q) -> ItemStream
    where
        Q: Fn(&mut Connection) -> RepoResult<Vec<Item>> + Clone + Send + Sync + 'static,
    {
        let store = self.store.clone();
        Box::pin(async_stream::stream! {
            // Subscribe before the first read so no commit slips in between.
            let mut changes = store.subscribe(ITEMS_TABLE);
            loop {
                let snapshot = store.run(query.clone()).await;
                let failed = snapshot.is_err();
                yield snapshot;
                if failed {
                    break;
                }

                match changes.recv().await {
                    Ok(_) | Err(RecvError::Lagged(_)) => drain_pending(&mut changes),
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[async_trait]
impl ItemRepository for SqliteItemRepository {
    async fn insert(&self, item: &Item) -> RepoResult<()> {
        let row = item.clone();
        let policy = self.conflict_policy;
        let changed = self
            .store
            .write(ITEMS_TABLE, move |conn| {
                conn.execute(
                    policy.insert_sql(),
                    params![row.id, row.name, row.price, row.quantity],
                )
                .map_err(|err| map_insert_error(err, row.id))
            })
            .await?;

        debug!(
            "event=item_insert module=repo status=ok id={} policy={:?} changed={changed}",
            item.id, policy
        );
        Ok(())
    }

    async fn update(&self, item: &Item) -> RepoResult<()> {
        let row = item.clone();
        let changed = self
            .store
            .write(ITEMS_TABLE, move |conn| -> RepoResult<usize> {
                Ok(conn.execute(
                    "UPDATE items
                     SET name = ?2, price = ?3, quantity = ?4
                     WHERE id = ?1;",
                    params![row.id, row.name, row.price, row.quantity],
                )?)
            })
            .await?;

        debug!(
            "event=item_update module=repo status=ok id={} changed={changed}",
            item.id
        );
        Ok(())
    }

    async fn delete(&self, item: &Item) -> RepoResult<()> {
        let row = item.clone();
        let changed = self
            .store
            .write(ITEMS_TABLE, move |conn| -> RepoResult<usize> {
                Ok(conn.execute(
                    "DELETE FROM items
                     WHERE id = ?1 AND name = ?2 AND price = ?3 AND quantity = ?4;",
                    params![row.id, row.name, row.price, row.quantity],
                )?)
            })
            .await?;

        debug!(
            "event=item_delete module=repo status=ok id={} changed={changed}",
            item.id
        );
        Ok(())
    }

    fn get_item(&self, id: ItemId) -> ItemStream {
        self.observe(move |conn| select_items(conn, ITEM_BY_ID_SQL, [id]))
    }

    fn get_all_items(&self) -> ItemStream {
        self.observe(|conn| select_items(conn, ALL_ITEMS_SQL, []))
    }
}

/// Waits for the first snapshot of `stream`.
///
/// A stream that ended without yielding means the store was closed.
pub async fn first_snapshot(mut stream: ItemStream) -> RepoResult<Vec<Item>> {
    stream
        .next()
        .await
        .unwrap_or(Err(RepoError::Db(DbError::NotOpen)))
}

/// Collapses notifications that queued up while the last snapshot was read.
fn drain_pending(changes: &mut tokio::sync::broadcast::Receiver<u64>) {
    loop {
        match changes.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

fn select_items(conn: &mut Connection, sql: &str, params: impl Params) -> RepoResult<Vec<Item>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query(params)?;
    let mut items = Vec::new();

    while let Some(row) = rows.next()? {
        items.push(parse_item_row(row)?);
    }

    Ok(items)
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    Ok(Item {
        id: row.get("id").map_err(invalid_column)?,
        name: row.get("name").map_err(invalid_column)?,
        price: row.get("price").map_err(invalid_column)?,
        quantity: row.get("quantity").map_err(invalid_column)?,
    })
}

fn invalid_column(err: rusqlite::Error) -> RepoError {
    match err {
        rusqlite::Error::InvalidColumnType(_, column, kind) => {
            RepoError::InvalidData(format!("unexpected {kind} value in items.{column}"))
        }
        rusqlite::Error::FromSqlConversionFailure(_, kind, source) => {
            RepoError::InvalidData(format!("cannot convert {kind} value: {source}"))
        }
        rusqlite::Error::IntegralValueOutOfRange(_, value) => {
            RepoError::InvalidData(format!("integer value {value} out of range"))
        }
        other => RepoError::from(other),
    }
}

fn map_insert_error(err: rusqlite::Error, id: ItemId) -> RepoError {
    match err {
        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepoError::ConstraintViolation { id }
        }
        other => RepoError::from(other),
    }
}
