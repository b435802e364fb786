//! Connection acquire/release for store operations.
//!
//! A [`Lease`] wraps one open [`Connection`] for the duration of a single
//! gateway call. Dropping the lease releases the connection: it is either
//! closed outright ([`ConnectionStrategy::PerCall`]) or parked in a bounded
//! idle set ([`ConnectionStrategy::Pooled`]). Close failures are logged and
//! never replace the result of the operation that held the lease.

use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};

use super::error::{StorageError, StorageResult};

/// Default time SQLite waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// How connections are obtained and released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStrategy {
    /// Open a new connection for every operation and close it afterwards.
    #[default]
    PerCall,
    /// Reuse idle connections, keeping at most `max_idle` open between calls.
    Pooled {
        /// Upper bound on connections held while no operation is running.
        max_idle: usize,
    },
}

impl fmt::Display for ConnectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStrategy::PerCall => write!(f, "per-call"),
            ConnectionStrategy::Pooled { max_idle } => write!(f, "pooled({max_idle})"),
        }
    }
}

/// Options applied when a store is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Connection acquire/release strategy.
    pub strategy: ConnectionStrategy,
    /// SQLite busy timeout set on every opened connection.
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            strategy: ConnectionStrategy::PerCall,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl StoreOptions {
    /// Set the connection strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: ConnectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the busy timeout.
    #[must_use]
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}

/// Source of connections to one store file.
pub(crate) struct ConnectionSource {
    path: PathBuf,
    busy_timeout: Duration,
    strategy: ConnectionStrategy,
    idle: Mutex<Vec<Connection>>,
}

impl ConnectionSource {
    pub(crate) fn new(path: &Path, options: StoreOptions) -> Self {
        let strategy = match options.strategy {
            ConnectionStrategy::Pooled { max_idle } => ConnectionStrategy::Pooled {
                max_idle: max_idle.max(1),
            },
            other => other,
        };
        Self {
            // SQLite reads a relative `file:` name as a URI; an absolute path is
            // always taken literally.
            path: std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
            busy_timeout: options.busy_timeout,
            strategy,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Per-call source with default options.
    pub(crate) fn per_call(path: &Path) -> Self {
        Self::new(path, StoreOptions::default())
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn strategy(&self) -> ConnectionStrategy {
        self.strategy
    }

    /// Number of connections currently parked in the idle set.
    pub(crate) fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Acquire a connection for one operation.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if a new connection is needed and
    /// the store cannot be opened.
    pub(crate) fn acquire(&self) -> StorageResult<Lease<'_>> {
        let reused = match self.strategy {
            ConnectionStrategy::PerCall => None,
            ConnectionStrategy::Pooled { .. } => self.idle.lock().pop(),
        };

        let conn = match reused {
            Some(conn) => conn,
            None => self.open()?,
        };

        Ok(Lease {
            conn: Some(conn),
            source: self,
        })
    }

    fn open(&self) -> StorageResult<Connection> {
        // Never create here: a missing file means the store was not initialized.
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&self.path, flags).map_err(|source| {
            StorageError::Connection {
                path: self.path.clone(),
                source,
            }
        })?;

        if let Err(source) = conn.busy_timeout(self.busy_timeout) {
            close_connection(conn, &self.path);
            return Err(StorageError::Connection {
                path: self.path.clone(),
                source,
            });
        }

        log::trace!("Opened connection to {}", self.path.display());
        Ok(conn)
    }

    fn release(&self, conn: Connection) {
        if let ConnectionStrategy::Pooled { max_idle } = self.strategy {
            let mut idle = self.idle.lock();
            if idle.len() < max_idle {
                idle.push(conn);
                return;
            }
        }
        close_connection(conn, &self.path);
    }
}

impl Drop for ConnectionSource {
    fn drop(&mut self) {
        for conn in self.idle.get_mut().drain(..) {
            close_connection(conn, &self.path);
        }
    }
}

/// Close a connection, logging (not returning) any failure.
fn close_connection(conn: Connection, path: &Path) {
    if let Err((_conn, e)) = conn.close() {
        log::error!("could not close the database {}: {}", path.display(), e);
    } else {
        log::trace!("Closed connection to {}", path.display());
    }
}

/// A connection held for the duration of one operation.
pub(crate) struct Lease<'a> {
    conn: Option<Connection>,
    source: &'a ConnectionSource,
}

impl Deref for Lease<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only `drop` takes the connection out.
        self.conn.as_ref().unwrap_or_else(|| unreachable!("lease used after release"))
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.source.release(conn);
        }
    }
}
