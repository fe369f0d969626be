//! Append-only, CRC32-checked, length-prefixed event journal.
//!
//! Entry layout on disk: `[4 bytes little-endian length][payload bytes][4 bytes
//! little-endian CRC32 of payload]`. `append` fsyncs before returning so a
//! record is never reported as committed before it is durable; replay on
//! [`Journal::open`] rebuilds the sequence of records from scratch.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::order::Order;
use crate::repository::error::JournalError;
use crate::trade::{Trade, TradeId};

const LENGTH_PREFIX_SIZE: usize = 4;
const CRC_SIZE: usize = 4;

/// One durable event appended to the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JournalRecord {
    /// An order was created or mutated.
    OrderSaved(Order),
    /// A trade was executed.
    TradeSaved(Trade),
    /// A trade transitioned to settled.
    TradeSettled {
        /// The trade that was settled.
        trade_id: TradeId,
        /// Settlement timestamp, milliseconds since the Unix epoch.
        settled_at: u64,
    },
}

/// An append-only write-ahead log of [`JournalRecord`]s backed by a single file.
pub struct Journal {
    file: Mutex<File>,
    path: PathBuf,
}

impl Journal {
    /// Opens (creating if absent) the journal file at `path`, replays every
    /// record currently on disk, and returns both the journal handle (ready
    /// to accept further [`Journal::append`] calls) and the replayed records
    /// in commit order.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<JournalRecord>), JournalError> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            Self::read_all(&path)?
        } else {
            Vec::new()
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_with_path(e, &path))?;
        Ok((
            Journal {
                file: Mutex::new(file),
                path,
            },
            records,
        ))
    }

    /// Appends one record, fsyncing before returning.
    pub fn append(&self, record: &JournalRecord) -> Result<(), JournalError> {
        let payload = serde_json::to_vec(record)?;
        let crc = crc32fast::hash(&payload);
        let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len() + CRC_SIZE);
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&payload);
        buf.extend_from_slice(&crc.to_le_bytes());

        let mut file = self.file.lock().expect("journal mutex poisoned");
        file.write_all(&buf).map_err(|e| io_with_path(e, &self.path))?;
        file.sync_data().map_err(|e| io_with_path(e, &self.path))
    }

    fn read_all(path: &Path) -> Result<Vec<JournalRecord>, JournalError> {
        let file = File::open(path).map_err(|e| io_with_path(e, path))?;
        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
            if !read_exact_or_eof(&mut reader, &mut len_buf)? {
                break;
            }
            let len = u32::from_le_bytes(len_buf) as usize;

            let mut payload = vec![0u8; len];
            reader
                .read_exact(&mut payload)
                .map_err(|_| JournalError::TruncatedEntry { offset })?;

            let mut crc_buf = [0u8; CRC_SIZE];
            reader
                .read_exact(&mut crc_buf)
                .map_err(|_| JournalError::TruncatedEntry { offset })?;
            let expected_crc = u32::from_le_bytes(crc_buf);
            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                return Err(JournalError::CorruptEntry {
                    offset,
                    expected_crc,
                    actual_crc,
                });
            }

            let record: JournalRecord = serde_json::from_slice(&payload)?;
            records.push(record);
            offset += (LENGTH_PREFIX_SIZE + len + CRC_SIZE) as u64;
        }

        Ok(records)
    }
}

/// Reads exactly `buf.len()` bytes, returning `Ok(false)` if the reader was
/// already at EOF before any byte was read (a clean end-of-journal), or an
/// error if EOF was hit partway through (a truncated final entry).
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool, JournalError> {
    let mut read = 0;
    while read < buf.len() {
        match reader.read(&mut buf[read..]) {
            Ok(0) => {
                if read == 0 {
                    return Ok(false);
                }
                return Err(JournalError::TruncatedEntry { offset: read as u64 });
            }
            Ok(n) => read += n,
            Err(e) => return Err(JournalError::Io {
                message: e.to_string(),
                path: None,
            }),
        }
    }
    Ok(true)
}

fn io_with_path(err: std::io::Error, path: &Path) -> JournalError {
    JournalError::Io {
        message: err.to_string(),
        path: Some(path.to_path_buf()),
    }
}
