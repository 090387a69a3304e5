//! Error types for bplusdb.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the tree and its storage layer.
///
/// `DuplicateKey`, `KeyNotFound` and `CursorAtEnd` are logical outcomes: the
/// operation that reported them changed nothing. Everything else is fatal to
/// the operation in progress (see [`Error::is_fatal`]).
#[derive(Debug, Error)]
pub enum Error {
    /// Insert of a key that is already present.
    #[error("key already exists")]
    DuplicateKey,

    /// Lookup or erase of a key that is not present.
    #[error("key not found")]
    KeyNotFound,

    /// The entry under the `end()` sentinel was read or modified.
    #[error("cursor is positioned past the last entry")]
    CursorAtEnd,

    /// I/O error from the backing file.
    ///
    /// This wraps `std::io::Error` from seek/read/write operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record on disk failed validation (checksum, magic, bounds).
    #[error("corrupted record at offset {offset}: {reason}")]
    Corrupted {
        /// Byte offset of the offending record.
        offset: u64,
        /// What failed to validate.
        reason: String,
    },

    /// A structural expectation of the tree did not hold.
    ///
    /// This indicates a prior corruption or a bug; the operation is aborted.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The configuration cannot produce a usable tree, or does not match the
    /// store being opened.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Returns true for errors that leave the operation aborted rather than
    /// reporting a plain logical outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Corrupted { .. } | Error::InvariantViolation(_)
        )
    }

    pub(crate) fn corrupted(offset: u64, reason: impl Into<String>) -> Self {
        Error::Corrupted {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Error::InvariantViolation(message.into())
    }
}
