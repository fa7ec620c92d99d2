use std::{fs, path::Path, sync::Arc};

use bitflags::bitflags;
use memmap2::MmapOptions;

use crate::{zlib, Data, DataReader, StreamError};

bitflags! {
    /// Describes how the bytes of [`SavedData`] are encoded.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct SavedDataType: u32 {
        /// The stored bytes are a zlib stream.
        const ZLIB_COMPRESSED = 1 << 0;
        /// The loaded bytes are a persisted dictionary.
        const DICT = 1 << 1;
    }
}

impl SavedDataType {
    /// Stored bytes are used as-is.
    pub const NONE: Self = Self::empty();
}

#[derive(Clone, Debug)]
enum Source {
    Memory(Data),
    File {
        path: Arc<Path>,
        offset: usize,
        size: usize,
    },
}

/// A lazily materialized byte range.
///
/// Saved data either refers to a view of an in-memory buffer or to
/// a byte range of a file. File-backed data is not touched until it
/// is actually loaded, so describing huge regions is free.
#[derive(Clone, Debug)]
pub struct SavedData {
    source: Source,
    loaded_size: usize,
    kind: SavedDataType,
}

impl SavedData {
    /// Creates saved data over an in-memory buffer.
    pub fn from_data(data: Data, loaded_size: usize, kind: SavedDataType) -> Self {
        Self {
            source: Source::Memory(data),
            loaded_size,
            kind,
        }
    }

    /// Creates saved data over `saved_size` bytes at `offset` in the
    /// file at `path`.
    ///
    /// This performs no file I/O.
    pub fn from_file(
        path: impl Into<Arc<Path>>,
        offset: usize,
        saved_size: usize,
        loaded_size: usize,
        kind: SavedDataType,
    ) -> Self {
        Self {
            source: Source::File {
                path: path.into(),
                offset,
                size: saved_size,
            },
            loaded_size,
            kind,
        }
    }

    /// Compresses `data` and wraps it into in-memory saved data with
    /// the additional `kind` bits.
    pub fn compress(data: &[u8], kind: SavedDataType) -> Result<Self, StreamError> {
        Ok(Self::from_data(
            zlib::deflate(data)?,
            data.len(),
            kind | SavedDataType::ZLIB_COMPRESSED,
        ))
    }

    /// Gets the number of bytes the data occupies in storage.
    #[inline]
    pub fn saved_size(&self) -> usize {
        match &self.source {
            Source::Memory(data) => data.len(),
            Source::File { size, .. } => *size,
        }
    }

    /// Gets the number of bytes once the data is loaded and decoded.
    #[inline]
    pub fn loaded_size(&self) -> usize {
        self.loaded_size
    }

    /// Gets the encoding of the stored bytes.
    #[inline]
    pub fn kind(&self) -> SavedDataType {
        self.kind
    }

    /// Whether the stored bytes live in a file rather than in memory.
    #[inline]
    pub fn is_file_backed(&self) -> bool {
        matches!(self.source, Source::File { .. })
    }

    /// Materializes the stored bytes without decoding them.
    pub fn saved_data(&self) -> Result<Data, StreamError> {
        match &self.source {
            Source::Memory(data) => Ok(data.clone()),
            Source::File { path, offset, size } => {
                log::trace!(
                    "Mapping {size} bytes at {offset} from '{}'",
                    path.display()
                );

                if *size == 0 {
                    return Ok(Data::empty());
                }

                let file = fs::File::open(path)?;
                let file_size = file.metadata()?.len() as usize;
                crate::check_range(*offset, *size, file_size)?;

                // SAFETY: Resource files are treated as read-only while
                // the process runs; see `FileReader::open_mmap`.
                let map = unsafe {
                    MmapOptions::new()
                        .offset(*offset as u64)
                        .len(*size)
                        .map(&file)?
                };

                Ok(Data::mapped(map))
            }
        }
    }

    /// Materializes and decodes the stored bytes.
    ///
    /// Compressed data is inflated to its logical size.
    pub fn loaded_data(&self) -> Result<Data, StreamError> {
        if !self.kind.contains(SavedDataType::ZLIB_COMPRESSED) {
            return self.saved_data();
        }

        let data = self.saved_data()?;
        zlib::inflate(&data, self.loaded_size)
    }

    /// Gets a reader over the loaded and decoded bytes.
    #[inline]
    pub fn loaded_reader(&self) -> Result<DataReader, StreamError> {
        self.loaded_data().map(DataReader::new)
    }
}
