//! Record gateway: lookup and upsert against the `fileHash` table.
//!
//! Every operation follows the same sequence: acquire a connection, prepare
//! one statement, run it, release. The statement and any cursor borrow from
//! the connection lease, so all three are released on every exit path.

use std::path::Path;

use rusqlite::{params, Connection};

use super::connection::{ConnectionSource, ConnectionStrategy};
use super::error::{Operation, StorageError, StorageResult};
use super::record::Record;

const SELECT_RECORD: &str = "SELECT hash, filename, lastChecked FROM fileHash WHERE hash = ?1";

const UPSERT_RECORD: &str = "INSERT INTO fileHash (hash, filename, lastChecked) VALUES (?1, ?2, ?3) \
     ON CONFLICT(hash) DO UPDATE SET filename = excluded.filename, lastChecked = excluded.lastChecked";

const COUNT_RECORDS: &str = "SELECT COUNT(*) FROM fileHash";

/// Handle to an initialized store.
///
/// Obtained from [`initialize`](super::initialize). The handle holds no
/// connection of its own; each call acquires one according to its
/// [`ConnectionStrategy`].
///
/// # Example
///
/// ```no_run
/// use hashsoak::store;
///
/// let store = store::initialize("./db.sqlite").unwrap();
/// if !store.lookup("aZ3...").unwrap() {
///     store.save("aZ3...", "aZ3....temp").unwrap();
/// }
/// println!("{} rows", store.count().unwrap());
/// ```
pub struct StoreHandle {
    source: ConnectionSource,
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("path", &self.source.path())
            .field("strategy", &self.source.strategy())
            .finish()
    }
}

impl StoreHandle {
    pub(crate) fn from_source(source: ConnectionSource) -> Self {
        Self { source }
    }

    /// Path of the backing store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.source.path()
    }

    /// Connection strategy used by this handle.
    #[must_use]
    pub fn strategy(&self) -> ConnectionStrategy {
        self.source.strategy()
    }

    /// Connections currently held open between operations.
    ///
    /// Always zero for [`ConnectionStrategy::PerCall`].
    #[must_use]
    pub fn idle_connections(&self) -> usize {
        self.source.idle_count()
    }

    /// Check whether a record with `hash` exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the connection cannot be opened, the query
    /// cannot be prepared or run, or the matching row cannot be decoded.
    pub fn lookup(&self, hash: &str) -> StorageResult<bool> {
        let conn = self.source.acquire()?;
        Ok(select_record(&conn, Operation::Lookup, hash)?.is_some())
    }

    /// Read the full record for `hash`, if present.
    ///
    /// # Errors
    ///
    /// Same conditions as [`StoreHandle::lookup`].
    pub fn fetch(&self, hash: &str) -> StorageResult<Option<Record>> {
        let conn = self.source.acquire()?;
        select_record(&conn, Operation::Fetch, hash)
    }

    /// Insert or replace the record for `hash`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the connection cannot be opened or the
    /// upsert cannot be prepared or run. A failed save leaves any existing
    /// row unchanged.
    pub fn save(&self, hash: &str, filename: &str) -> StorageResult<()> {
        self.save_at(hash, filename, now())
    }

    /// Insert or replace the record for `hash` with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Same conditions as [`StoreHandle::save`].
    pub fn save_at(&self, hash: &str, filename: &str, last_checked: i64) -> StorageResult<()> {
        let conn = self.source.acquire()?;
        upsert_record(&conn, hash, filename, last_checked)
    }

    /// Number of records in the store.
    ///
    /// # Errors
    ///
    /// Same conditions as [`StoreHandle::lookup`].
    pub fn count(&self) -> StorageResult<u64> {
        let conn = self.source.acquire()?;
        count_records(&conn)
    }
}

/// Check whether `hash` exists in the store at `path`, on a fresh connection.
///
/// # Errors
///
/// See [`StoreHandle::lookup`].
pub fn lookup(path: impl AsRef<Path>, hash: &str) -> StorageResult<bool> {
    let source = ConnectionSource::per_call(path.as_ref());
    let conn = source.acquire()?;
    Ok(select_record(&conn, Operation::Lookup, hash)?.is_some())
}

/// Read the record for `hash` from the store at `path`, on a fresh connection.
///
/// # Errors
///
/// See [`StoreHandle::fetch`].
pub fn fetch(path: impl AsRef<Path>, hash: &str) -> StorageResult<Option<Record>> {
    let source = ConnectionSource::per_call(path.as_ref());
    let conn = source.acquire()?;
    select_record(&conn, Operation::Fetch, hash)
}

/// Upsert `hash` into the store at `path`, on a fresh connection.
///
/// # Errors
///
/// See [`StoreHandle::save`].
pub fn save(path: impl AsRef<Path>, hash: &str, filename: &str) -> StorageResult<()> {
    save_at(path, hash, filename, now())
}

/// Upsert `hash` with an explicit timestamp, on a fresh connection.
///
/// # Errors
///
/// See [`StoreHandle::save`].
pub fn save_at(
    path: impl AsRef<Path>,
    hash: &str,
    filename: &str,
    last_checked: i64,
) -> StorageResult<()> {
    let source = ConnectionSource::per_call(path.as_ref());
    let conn = source.acquire()?;
    upsert_record(&conn, hash, filename, last_checked)
}

/// Count records in the store at `path`, on a fresh connection.
///
/// # Errors
///
/// See [`StoreHandle::count`].
pub fn count(path: impl AsRef<Path>) -> StorageResult<u64> {
    let source = ConnectionSource::per_call(path.as_ref());
    let conn = source.acquire()?;
    count_records(&conn)
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn select_record(conn: &Connection, operation: Operation, hash: &str) -> StorageResult<Option<Record>> {
    let mut stmt = conn
        .prepare(SELECT_RECORD)
        .map_err(|source| StorageError::Statement { operation, source })?;

    let mut rows = stmt
        .query(params![hash])
        .map_err(|source| StorageError::from_run(operation, source))?;

    let Some(row) = rows
        .next()
        .map_err(|source| StorageError::Execution { operation, source })?
    else {
        return Ok(None);
    };

    let record = Record::from_row(row).map_err(|source| StorageError::Decode { operation, source })?;

    log::trace!(
        "Found hash {} (file: {}, last checked: {})",
        record.hash,
        record.filename,
        record.last_checked_display()
    );
    Ok(Some(record))
}

fn upsert_record(conn: &Connection, hash: &str, filename: &str, last_checked: i64) -> StorageResult<()> {
    let operation = Operation::Save;
    let mut stmt = conn
        .prepare(UPSERT_RECORD)
        .map_err(|source| StorageError::Statement { operation, source })?;

    stmt.execute(params![hash, filename, last_checked])
        .map_err(|source| StorageError::from_run(operation, source))?;

    log::debug!("Saved hash {} to database (file: {})", hash, filename);
    Ok(())
}

fn count_records(conn: &Connection) -> StorageResult<u64> {
    let operation = Operation::Count;
    let mut stmt = conn
        .prepare(COUNT_RECORDS)
        .map_err(|source| StorageError::Statement { operation, source })?;

    let mut rows = stmt
        .query([])
        .map_err(|source| StorageError::from_run(operation, source))?;

    let row = rows
        .next()
        .map_err(|source| StorageError::Execution { operation, source })?
        .ok_or(StorageError::Decode {
            operation,
            source: rusqlite::Error::QueryReturnedNoRows,
        })?;

    let count: i64 = row
        .get(0)
        .map_err(|source| StorageError::Decode { operation, source })?;

    u64::try_from(count).map_err(|_| StorageError::Decode {
        operation,
        source: rusqlite::Error::IntegralValueOutOfRange(0, count),
    })
}
