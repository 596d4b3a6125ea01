//! Store error taxonomy.

/// Errors produced by the durable store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying `SQLite` error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool exhausted or unavailable.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The database stayed busy/locked through every retry attempt.
    /// Surfaced only after the bounded retry loop gives up; transient
    /// contention below that threshold is absorbed internally.
    #[error("database busy after {attempts} attempts")]
    Busy {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// Event payload could not be serialized for storage.
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether this is transient `SQLite` contention worth retrying.
    pub fn is_transient_contention(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(code, _)) => matches!(
                code.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Whether retries were already exhausted on transient contention.
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}

/// Result alias for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
