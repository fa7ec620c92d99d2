//! Byte-addressable streams and lazily materialized saved data.
//!
//! Readers and writers operate over in-memory buffers or files and
//! never move their position past the end of the stream. A reader can
//! hand out a [`SavedData`] view of one of its byte ranges instead of
//! copying the bytes eagerly; the view is only read when it actually
//! gets loaded.

#![deny(
    rust_2018_idioms,
    rustdoc::broken_intra_doc_links,
    unsafe_op_in_unsafe_fn
)]

use std::io;

use libdeflater::{CompressionError, DecompressionError};
use thiserror::Error;

mod copy;
pub use copy::*;

mod data;
pub use data::Data;

mod reader;
pub use reader::*;

mod saved_data;
pub use saved_data::*;

mod writer;
pub use writer::*;

mod zlib;
pub use zlib::{inflate_limit, MAX_INFLATE_RATIO};

/// Errors that may occur when working with streams and saved data.
#[derive(Debug, Error)]
pub enum StreamError {
    /// An I/O operation on a backing file failed.
    #[error("{0}")]
    Io(#[from] io::Error),

    /// Decompression of saved data failed.
    #[error("failed to decompress saved data: {0}")]
    Decompress(#[from] DecompressionError),

    /// Compression of saved data failed.
    #[error("failed to compress saved data: {0}")]
    Compress(#[from] CompressionError),

    /// The inflated size of saved data does not match its logical size.
    #[error("mismatch for inflated data size: expected {expected}, got {actual}")]
    DecompressedSizeMismatch { expected: usize, actual: usize },

    /// The persisted inflated size of saved data cannot be reached
    /// from its stored size.
    #[error("inflated size {loaded_size} exceeds limit {limit} for {saved_size} stored bytes")]
    ImplausibleSize {
        loaded_size: usize,
        saved_size: usize,
        limit: usize,
    },

    /// A requested byte range does not fit into the stream.
    #[error("range of {size} bytes at {offset} exceeds stream size {stream_size}")]
    OutOfRange {
        offset: usize,
        size: usize,
        stream_size: usize,
    },
}

#[inline]
pub(crate) fn check_range(offset: usize, size: usize, stream_size: usize) -> Result<(), StreamError> {
    match offset.checked_add(size) {
        Some(end) if end <= stream_size => Ok(()),
        _ => Err(StreamError::OutOfRange {
            offset,
            size,
            stream_size,
        }),
    }
}
