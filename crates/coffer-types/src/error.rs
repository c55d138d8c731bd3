use thiserror::Error;

/// Errors surfaced by store operations.
///
/// The taxonomy is closed: every public operation in the coffer crates
/// returns one of these kinds or success. Errors are returned by value;
/// recoverable conditions never panic.
#[derive(Debug, Error, PartialEq)]
pub enum KvsError {
    /// The key is absent in the consulted layer(s).
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The snapshot id is outside the range of present snapshots.
    #[error("invalid snapshot id {requested} (present: {available})")]
    InvalidSnapshotId { requested: usize, available: usize },

    /// A required payload file is missing or unreadable.
    #[error("kvs file read error: {0}")]
    KvsFileReadError(String),

    /// A checksum sidecar file is missing or unreadable.
    #[error("kvs hash file read error: {0}")]
    KvsHashFileReadError(String),

    /// The payload or defaults text is not well-formed.
    #[error("json parser error: {0}")]
    JsonParserError(String),

    /// Checksum mismatch or semantic validation failure.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// The value lies outside the representable domain.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Result alias used throughout the coffer crates.
pub type KvsResult<T> = Result<T, KvsError>;
