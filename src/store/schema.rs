//! Store initialization.
//!
//! The store file and the `fileHash` table are created together, once, when no
//! file exists at the configured path. An existing file is assumed to already
//! carry the schema and is only opened.

use std::fs::OpenOptions;
use std::path::Path;

use rusqlite::Connection;

use super::connection::{ConnectionSource, StoreOptions};
use super::error::{StorageError, StorageResult};
use super::gateway::StoreHandle;

/// Name of the single table held by the store.
pub const TABLE_NAME: &str = "fileHash";

const CREATE_TABLE: &str = r#"
    CREATE TABLE fileHash (
        "hash" TEXT NOT NULL PRIMARY KEY,
        "filename" TEXT,
        "lastChecked" INTEGER
    );
"#;

/// Initialize the store at `path` with default options (per-call connections).
///
/// # Errors
///
/// See [`initialize_with`].
pub fn initialize(path: impl AsRef<Path>) -> StorageResult<StoreHandle> {
    initialize_with(path, StoreOptions::default())
}

/// Initialize the store at `path` and return a handle using `options`.
///
/// If no file exists at `path`, an empty file is created and the `fileHash`
/// table is created in it. If a file exists, a connection is opened to prove
/// the store is reachable and nothing else is done.
///
/// # Errors
///
/// - [`StorageError::StoreCreation`] if the file or the table cannot be created,
///   or a freshly created file cannot be opened (the file is removed again)
/// - [`StorageError::Connection`] if an existing store cannot be opened
pub fn initialize_with(path: impl AsRef<Path>, options: StoreOptions) -> StorageResult<StoreHandle> {
    let path = path.as_ref();

    let is_new = !path
        .try_exists()
        .map_err(|e| StorageError::creation(path, e))?;

    if is_new {
        log::info!("Creating database {}", path.display());
        // create_new: another process creating the file first is a creation failure,
        // not something to silently reuse without a schema.
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| StorageError::creation(path, e))?;
        log::info!("Database created");
    }

    let source = ConnectionSource::new(path, options);
    {
        let conn = match source.acquire() {
            Ok(conn) => conn,
            Err(e) if is_new => {
                discard_new_store(path);
                return Err(StorageError::creation(path, e));
            }
            Err(e) => return Err(e),
        };
        if is_new {
            if let Err(e) = create_table(&conn) {
                drop(conn);
                drop(source);
                discard_new_store(path);
                return Err(StorageError::creation(path, e));
            }
        } else {
            log::debug!("Using existing database {}", path.display());
        }
    }

    Ok(StoreHandle::from_source(source))
}

fn create_table(conn: &Connection) -> rusqlite::Result<()> {
    log::info!("Creating database table {}", TABLE_NAME);
    conn.execute_batch(CREATE_TABLE)?;
    log::info!("Table {} created", TABLE_NAME);
    Ok(())
}

/// Remove a freshly created file whose schema could not be written, so the
/// next run does not mistake it for an initialized store.
fn discard_new_store(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        log::warn!(
            "could not remove partially created database {}: {}",
            path.display(),
            e
        );
    }
}
