//! Storage error taxonomy.

use std::fmt;
use std::path::PathBuf;

/// Result alias for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// The gateway operation an error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Existence check for a hash.
    Lookup,
    /// Upsert of a record.
    Save,
    /// Full read of a single record.
    Fetch,
    /// Row count of the table.
    Count,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Lookup => write!(f, "lookup"),
            Operation::Save => write!(f, "save"),
            Operation::Fetch => write!(f, "fetch"),
            Operation::Count => write!(f, "count"),
        }
    }
}

/// Errors raised by store initialization and the record gateway.
///
/// Each variant maps to one step of the per-call sequence
/// (connect, prepare, execute, decode). Gateway operations never retry; the
/// first error encountered is returned to the caller.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    /// The store file or its schema could not be created.
    #[error("could not create store at {path}: {source}")]
    StoreCreation {
        /// Path of the store being created
        path: PathBuf,
        /// The underlying I/O or SQLite error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The store could not be opened.
    #[error("could not open database {path}: {source}")]
    Connection {
        /// Path of the store being opened
        path: PathBuf,
        /// The underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// The statement could not be prepared or its parameters bound.
    #[error("could not prepare {operation} statement: {source}")]
    Statement {
        /// Operation that issued the statement
        operation: Operation,
        /// The underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// The statement failed while running.
    #[error("could not execute {operation} query: {source}")]
    Execution {
        /// Operation that issued the statement
        operation: Operation,
        /// The underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// A result row did not have the expected shape.
    #[error("could not read {operation} row: {source}")]
    Decode {
        /// Operation that read the row
        operation: Operation,
        /// The underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },
}

impl StorageError {
    pub(crate) fn creation(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::StoreCreation {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Classify an error returned by `Statement::query` or `Statement::execute`.
    ///
    /// Both calls bind parameters before stepping, so binding failures surface
    /// here too and belong to [`StorageError::Statement`].
    pub(crate) fn from_run(operation: Operation, source: rusqlite::Error) -> Self {
        match source {
            rusqlite::Error::InvalidParameterCount(..)
            | rusqlite::Error::InvalidParameterName(_)
            | rusqlite::Error::ToSqlConversionFailure(_) => Self::Statement { operation, source },
            _ => Self::Execution { operation, source },
        }
    }

    /// Short machine-readable label for the variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StoreCreation { .. } => "store_creation",
            Self::Connection { .. } => "connection",
            Self::Statement { .. } => "statement",
            Self::Execution { .. } => "execution",
            Self::Decode { .. } => "decode",
        }
    }
}
