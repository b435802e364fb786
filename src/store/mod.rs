//! SQLite-backed record store exercised by the soak harness.
//!
//! This module owns everything that touches the backing database file.
//!
//! # Architecture
//!
//! The store is split into a few small components:
//!
//! * [`schema`]: Store initialization. Creates the file and the `fileHash` table
//!   only when the file does not exist yet.
//! * [`gateway`]: The record operations (`lookup`, `save`, `fetch`, `count`) and
//!   the [`StoreHandle`] returned by initialization.
//! * [`connection`]: Acquire/release of connections, either opened fresh for
//!   every call or recycled from a bounded idle set.
//! * [`record`]: The persisted row type.
//! * [`error`]: The [`StorageError`] taxonomy.
//!
//! # Connection Discipline
//!
//! Every operation acquires a connection, runs exactly one statement and
//! releases the connection before returning, on success and on error alike.
//! Statements and cursors borrow from the connection lease, so they are always
//! finalized before the lease is released.

pub mod connection;
pub mod error;
pub mod gateway;
pub mod record;
pub mod schema;

pub use connection::{ConnectionStrategy, StoreOptions, DEFAULT_BUSY_TIMEOUT};
pub use error::{Operation, StorageError, StorageResult};
pub use gateway::{count, fetch, lookup, save, save_at, StoreHandle};
pub use record::Record;
pub use schema::{initialize, initialize_with, TABLE_NAME};
