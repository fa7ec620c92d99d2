//! zlib encoding of saved data.

use libdeflater::{CompressionLvl, Compressor, Decompressor};

use crate::{Data, StreamError};

/// The highest ratio of inflated to deflated size zlib can reach.
pub const MAX_INFLATE_RATIO: usize = 1032;

// zlib framing alone takes this many bytes.
const MIN_STREAM_SIZE: usize = 8;

/// Gets the largest size `saved_size` bytes of zlib data can inflate to.
#[inline]
pub fn inflate_limit(saved_size: usize) -> usize {
    saved_size.max(MIN_STREAM_SIZE).saturating_mul(MAX_INFLATE_RATIO)
}

pub(crate) fn deflate(data: &[u8]) -> Result<Data, StreamError> {
    let mut compressor = Compressor::new(CompressionLvl::best());
    let mut buf = vec![0; compressor.zlib_compress_bound(data.len())];

    let written = compressor.zlib_compress(data, &mut buf)?;
    buf.truncate(written);

    log::trace!("Deflated {} bytes to {written}", data.len());
    Ok(Data::new(buf))
}

/// Inflates `data` to exactly `loaded_size` bytes.
///
/// `loaded_size` is rejected before allocating when `data` cannot
/// possibly inflate to it.
pub(crate) fn inflate(data: &[u8], loaded_size: usize) -> Result<Data, StreamError> {
    let limit = inflate_limit(data.len());
    if loaded_size > limit {
        return Err(StreamError::ImplausibleSize {
            loaded_size,
            saved_size: data.len(),
            limit,
        });
    }

    let mut buf = vec![0; loaded_size];
    let written = Decompressor::new().zlib_decompress(data, &mut buf)?;
    if written != loaded_size {
        return Err(StreamError::DecompressedSizeMismatch {
            expected: loaded_size,
            actual: written,
        });
    }

    Ok(Data::new(buf))
}
