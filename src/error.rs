//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the hashsoak application.
///
/// - 0: Success (run completed or command finished)
/// - 1: General error (including store initialization failure)
/// - 2: Storage failure (a storage error terminated the run)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: The command completed normally.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Storage failure: A lookup or save error ended the run.
    StorageFailure = 2,
    /// Interrupted: The run was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "HS000",
            Self::GeneralError => "HS001",
            Self::StorageFailure => "HS002",
            Self::Interrupted => "HS130",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "HS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Storage error variant, when the error came from the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_kind: Option<&'static str>,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            storage_kind: err
                .downcast_ref::<crate::store::StorageError>()
                .map(crate::store::StorageError::kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StorageError;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::StorageFailure.as_i32(), 2);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
        assert_eq!(
            ExitCode::Interrupted.as_i32(),
            crate::signal::EXIT_CODE_INTERRUPTED
        );
    }

    #[test]
    fn test_code_prefixes() {
        assert_eq!(ExitCode::Success.code_prefix(), "HS000");
        assert_eq!(ExitCode::StorageFailure.code_prefix(), "HS002");
    }

    #[test]
    fn test_structured_error_from_storage_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing dir");
        let err = anyhow::Error::new(StorageError::creation("/x/db.sqlite", io))
            .context("Failed to initialize database");

        let structured = StructuredError::new(&err, ExitCode::GeneralError);

        assert_eq!(structured.code, "HS001");
        assert_eq!(structured.exit_code, 1);
        assert!(structured.message.starts_with("Failed to initialize database: "));
        assert!(structured.message.contains("missing dir"));
        assert_eq!(structured.storage_kind, Some("store_creation"));
    }

    #[test]
    fn test_structured_error_json_skips_absent_kind() {
        let err = anyhow::anyhow!("bad config");
        let json = serde_json::to_string(&StructuredError::new(&err, ExitCode::GeneralError)).unwrap();
        assert!(!json.contains("storage_kind"));
    }
}
