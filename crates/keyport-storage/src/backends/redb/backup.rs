//! Streaming backup and restore over the data table.

use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableTable, WriteTransaction};
use tracing::debug;

use crate::codec::{read_blob, write_blob};
use crate::engine::{StorageError, StorageResult};

use super::tables::{clear_table, DATA_TABLE};

/// Totals for one backup run.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackupStats {
    /// Key/value pairs written.
    pub pairs: u64,
    /// Payload bytes written, excluding blob headers.
    pub bytes: u64,
    /// Unix seconds when the backup finished.
    pub marker: u64,
}

/// Write every pair of a read snapshot as `bin(key) bin(value)` blobs.
///
/// # Errors
///
/// Returns [`StorageError::Io`] if the writer fails, or an engine error.
pub fn write_backup(db: &Database, writer: &mut dyn Write) -> StorageResult<BackupStats> {
    let tx = db.begin_read()?;
    let table = tx.open_table(DATA_TABLE)?;

    let mut stats = BackupStats::default();
    for item in table.iter()? {
        let (key, value) = item?;
        let (key, value) = (key.value(), value.value());

        write_blob(writer, key)?;
        write_blob(writer, value)?;

        stats.pairs += 1;
        stats.bytes += (key.len() + value.len()) as u64;
    }
    writer.flush()?;

    stats.marker = unix_seconds();
    Ok(stats)
}

/// Wipe the data table inside `tx` and refill it from `reader`.
///
/// Returns the number of pairs restored. The caller commits or aborts `tx`.
///
/// # Errors
///
/// Returns [`StorageError::InvalidFormat`] for a non-binary marker or a key
/// without a value, and [`StorageError::Io`] for a truncated blob.
pub fn restore_into(tx: &WriteTransaction, reader: &mut dyn Read) -> StorageResult<u64> {
    let mut table = tx.open_table(DATA_TABLE)?;
    if clear_table(&mut table)? {
        debug!("cleared existing data before restore");
    }

    let mut pairs = 0u64;
    while let Some(key) = read_blob(reader)? {
        let Some(value) = read_blob(reader)? else {
            return Err(StorageError::invalid_format(format!(
                "stream ended after key of {} bytes without a value",
                key.len()
            )));
        };
        table.insert(key.as_slice(), value.as_slice())?;
        pairs += 1;
    }

    Ok(pairs)
}

fn unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}
