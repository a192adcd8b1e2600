//! Block planning for chunked blob uploads.

use std::ops::Range;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Block identifiers are four decimal digits, so at most this many blocks exist.
pub const MAX_BLOCKS: usize = 10_000;

/// One contiguous slice of the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Zero-based sequence index; also the commit position
    pub index: usize,
    /// Storage block identifier
    pub id: String,
    /// Byte range within the payload
    pub range: Range<usize>,
}

impl Block {
    /// Length in bytes
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Whether the block covers no bytes
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Storage identifier for the block at `index`.
///
/// Base64 of the index as a zero-padded four-digit line, e.g. `"0007\n"`.
pub fn block_id(index: usize) -> String {
    STANDARD.encode(format!("{index:04}\n"))
}

/// Number of blocks needed for `len` bytes; zero when `block_size` is zero.
pub fn block_count(len: usize, block_size: usize) -> usize {
    if block_size == 0 {
        return 0;
    }
    len.div_ceil(block_size)
}

/// Split `len` bytes into ordered blocks of at most `block_size` bytes.
///
/// Returns no blocks for an empty payload or a zero block size. Callers
/// check the count against [`MAX_BLOCKS`] before uploading.
pub fn split_blocks(len: usize, block_size: usize) -> Vec<Block> {
    (0..block_count(len, block_size))
        .map(|index| {
            let start = index * block_size;
            let end = (start + block_size).min(len);
            Block {
                index,
                id: block_id(index),
                range: start..end,
            }
        })
        .collect()
}
