//! Backward scanner for locating the last line of a stack file.
//!
//! The file is read in fixed-size chunks starting from the end, so popping a
//! short line from a large file only touches the bytes of that line.

use crate::DELIMITER;
use std::io::{self, Read, Seek, SeekFrom};
use tracing::trace;

/// The last line of a stack file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastLine {
    /// Line contents, delimiter excluded.
    pub value: Vec<u8>,

    /// Byte offset where the line begins. Truncating to this offset removes
    /// the line together with its terminator.
    pub start: u64,
}

/// Find the last line of a file of `size` bytes.
///
/// A delimiter in the final byte terminates the last line and is skipped.
/// The scan stops at the next delimiter before it, or at the start of the
/// file if there is none. `size` must be non-zero.
pub fn find_last_line<R: Read + Seek>(
    reader: &mut R,
    size: u64,
    chunk_size: usize,
) -> io::Result<LastLine> {
    debug_assert!(size > 0, "scanning an empty file");

    // Never allocate more than the file holds.
    let chunk_size = (chunk_size.max(1) as u64).min(size);
    let mut buf = vec![0u8; chunk_size as usize];

    // Pieces of the value, newest chunk first.
    let mut pieces: Vec<Vec<u8>> = Vec::new();
    let mut pos = size;
    let mut first = true;

    let start = loop {
        if pos == 0 {
            break 0;
        }

        let len = chunk_size.min(pos);
        let chunk_start = pos - len;
        reader.seek(SeekFrom::Start(chunk_start))?;
        let chunk = &mut buf[..len as usize];
        reader.read_exact(chunk)?;
        trace!(chunk_start, len, "read chunk");

        let mut scan: &[u8] = chunk;
        if first {
            first = false;
            if let Some((&DELIMITER, rest)) = scan.split_last() {
                scan = rest;
            }
        }

        match scan.iter().rposition(|&b| b == DELIMITER) {
            Some(i) => {
                pieces.push(scan[i + 1..].to_vec());
                break chunk_start + i as u64 + 1;
            }
            None => {
                pieces.push(scan.to_vec());
                pos = chunk_start;
            }
        }
    };

    let mut value = Vec::with_capacity(pieces.iter().map(Vec::len).sum());
    for piece in pieces.iter().rev() {
        value.extend_from_slice(piece);
    }

    Ok(LastLine { value, start })
}
