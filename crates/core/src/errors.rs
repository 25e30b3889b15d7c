use thiserror::Error;

/// Unified error type for the entire rebalancer-core library.
///
/// Numeric edge cases (bad prices, zero totals, missing exchange rates) are
/// recovered locally by the engine and never surface here. Only operations
/// that the caller must react to return a `CoreError`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid transition: cannot {action} while {from}")]
    InvalidTransition { from: String, action: String },

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    // ── Persisted State ─────────────────────────────────────────────
    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // ── File I/O (native only) ──────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<base64::DecodeError> for CoreError {
    fn from(e: base64::DecodeError) -> Self {
        CoreError::InvalidFileFormat(format!("Invalid base64 payload: {e}"))
    }
}
