//! Length-prefixed blob codec for backup streams.
//!
//! A backup stream is a flat sequence of `MessagePack` `bin` blobs
//! (`bin8`, `bin16` or `bin32` marker, big-endian length, payload),
//! alternating key and value. There is no envelope, record count or
//! checksum; a clean end of stream is the only terminator.

use std::io::{self, Read, Write};

use rmp::decode::ValueReadError;
use rmp::encode::ValueWriteError;

use crate::engine::{StorageError, StorageResult};

/// Write one binary blob.
///
/// # Errors
///
/// Returns [`StorageError::Io`] if the writer fails.
pub fn write_blob<W: Write + ?Sized>(mut writer: &mut W, data: &[u8]) -> StorageResult<()> {
    rmp::encode::write_bin(&mut writer, data).map_err(|e| match e {
        ValueWriteError::InvalidMarkerWrite(e) | ValueWriteError::InvalidDataWrite(e) => {
            StorageError::Io(e)
        }
    })
}

/// Read one binary blob, or `None` at a clean end of stream.
///
/// # Errors
///
/// Returns [`StorageError::InvalidFormat`] if the next marker is not a binary
/// marker, and [`StorageError::Io`] if the stream ends inside a blob.
pub fn read_blob<R: Read + ?Sized>(mut reader: &mut R) -> StorageResult<Option<Vec<u8>>> {
    let len = match rmp::decode::read_bin_len(&mut reader) {
        Ok(len) => len,
        // The marker is a single byte, so EOF here means nothing was left.
        Err(ValueReadError::InvalidMarkerRead(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Ok(None);
        }
        Err(ValueReadError::InvalidMarkerRead(e) | ValueReadError::InvalidDataRead(e)) => {
            return Err(StorageError::Io(e));
        }
        Err(ValueReadError::TypeMismatch(marker)) => {
            return Err(StorageError::invalid_format(format!(
                "expected binary blob, found marker {marker:?}"
            )));
        }
    };

    // Grow with the data actually present instead of trusting the header.
    let mut blob = Vec::new();
    reader.take(u64::from(len)).read_to_end(&mut blob)?;
    if blob.len() as u64 != u64::from(len) {
        return Err(StorageError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("blob truncated: expected {len} bytes, got {}", blob.len()),
        )));
    }
    Ok(Some(blob))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_blob_header_sizes() {
        let mut out = Vec::new();
        write_blob(&mut out, b"abc").unwrap();
        assert_eq!(out, vec![0xc4, 3, b'a', b'b', b'c']);

        let mut out = Vec::new();
        write_blob(&mut out, &[7u8; 300]).unwrap();
        assert_eq!(&out[..3], &[0xc5, 0x01, 0x2c]);
        assert_eq!(out.len(), 303);
    }

    #[test]
    fn test_read_sequence_then_eof() {
        let mut out = Vec::new();
        write_blob(&mut out, b"key").unwrap();
        write_blob(&mut out, b"").unwrap();

        let mut cursor = Cursor::new(out);
        assert_eq!(read_blob(&mut cursor).unwrap(), Some(b"key".to_vec()));
        assert_eq!(read_blob(&mut cursor).unwrap(), Some(Vec::new()));
        assert_eq!(read_blob(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_non_binary_marker_is_invalid_format() {
        // 0xa3 is a fixstr marker.
        let mut cursor = Cursor::new(vec![0xa3, b'a', b'b', b'c']);
        let err = read_blob(&mut cursor).unwrap_err();
        assert!(matches!(err, StorageError::InvalidFormat(_)));
    }

    #[test]
    fn test_truncated_payload_is_io_error() {
        let mut cursor = Cursor::new(vec![0xc4, 10, 1, 2, 3]);
        let err = read_blob(&mut cursor).unwrap_err();
        match err {
            StorageError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_length_is_io_error() {
        // bin16 marker with a single length byte.
        let mut cursor = Cursor::new(vec![0xc5, 0x01]);
        let err = read_blob(&mut cursor).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
