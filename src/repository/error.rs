//! Error types for the journal and repository subsystems.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur within the append-only journal.
#[derive(Debug)]
#[non_exhaustive]
pub enum JournalError {
    /// An I/O error occurred while reading or writing the journal file.
    Io {
        /// The underlying I/O error message.
        message: String,
        /// The file path involved, if known.
        path: Option<PathBuf>,
    },
    /// A journal entry failed CRC32 integrity verification on replay.
    CorruptEntry {
        /// Byte offset of the corrupt entry within the file.
        offset: u64,
        /// The expected CRC32 checksum.
        expected_crc: u32,
        /// The actual CRC32 checksum computed from the entry bytes.
        actual_crc: u32,
    },
    /// A journal entry's length prefix claims more bytes than remain in the file.
    TruncatedEntry {
        /// Byte offset where the truncated entry begins.
        offset: u64,
    },
    /// The entry payload could not be (de)serialized as a [`super::journal::JournalRecord`].
    Codec {
        /// The underlying serde error message.
        message: String,
    },
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalError::Io { message, path } => {
                if let Some(p) = path {
                    write!(f, "journal I/O error at {}: {message}", p.display())
                } else {
                    write!(f, "journal I/O error: {message}")
                }
            }
            JournalError::CorruptEntry {
                offset,
                expected_crc,
                actual_crc,
            } => write!(
                f,
                "corrupt journal entry at offset {offset}: expected CRC {expected_crc:#010x}, got {actual_crc:#010x}"
            ),
            JournalError::TruncatedEntry { offset } => {
                write!(f, "truncated journal entry at offset {offset}")
            }
            JournalError::Codec { message } => write!(f, "journal codec error: {message}"),
        }
    }
}

impl std::error::Error for JournalError {}

impl From<std::io::Error> for JournalError {
    #[cold]
    fn from(err: std::io::Error) -> Self {
        JournalError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for JournalError {
    #[cold]
    fn from(err: serde_json::Error) -> Self {
        JournalError::Codec {
            message: err.to_string(),
        }
    }
}

/// Errors surfaced by a [`super::Repository`] implementation.
#[derive(Debug)]
#[non_exhaustive]
pub enum RepositoryError {
    /// The underlying journal failed to durably persist a record.
    Journal(JournalError),
    /// The referenced trade has already been settled.
    AlreadySettled,
    /// The referenced trade id is unknown.
    TradeNotFound,
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::Journal(e) => write!(f, "{e}"),
            RepositoryError::AlreadySettled => write!(f, "trade already settled"),
            RepositoryError::TradeNotFound => write!(f, "trade not found"),
        }
    }
}

impl std::error::Error for RepositoryError {}

impl From<JournalError> for RepositoryError {
    fn from(err: JournalError) -> Self {
        RepositoryError::Journal(err)
    }
}
