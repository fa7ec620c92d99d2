use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

use memmap2::MmapOptions;

use crate::{check_range, Data, SavedData, SavedDataType, StreamError};

/// A byte source with a known size and a seekable position.
///
/// The position never exceeds the size; reading past the end yields
/// a short read rather than an error.
pub trait Reader: Read + Send {
    /// Gets the total size of the stream in bytes.
    fn size(&self) -> usize;

    /// Gets the current position in the stream.
    fn pos(&self) -> usize;

    /// Moves to `pos`, clamped to the size of the stream.
    ///
    /// Returns the new position.
    fn set_pos(&mut self, pos: usize) -> usize;

    /// Describes `saved_size` bytes at `offset` as [`SavedData`] that
    /// inflates to `loaded_size` bytes according to `kind`.
    ///
    /// The bytes are not copied or read by this call.
    fn saved_data(
        &self,
        offset: usize,
        saved_size: usize,
        loaded_size: usize,
        kind: SavedDataType,
    ) -> Result<SavedData, StreamError>;
}

/// A [`Reader`] over an in-memory [`Data`] buffer.
#[derive(Clone, Debug)]
pub struct DataReader {
    data: Data,
    pos: usize,
}

impl DataReader {
    /// Creates a reader positioned at the start of `data`.
    pub fn new(data: Data) -> Self {
        Self { data, pos: 0 }
    }

    /// Gets the underlying buffer.
    #[inline]
    pub fn data(&self) -> &Data {
        &self.data
    }

    /// Gets the bytes that were not read yet.
    #[inline]
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }
}

impl Read for DataReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        let size = buf.len().min(remaining.len());

        buf[..size].copy_from_slice(&remaining[..size]);
        self.pos += size;

        Ok(size)
    }
}

impl Reader for DataReader {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn set_pos(&mut self, pos: usize) -> usize {
        self.pos = pos.min(self.size());
        self.pos
    }

    fn saved_data(
        &self,
        offset: usize,
        saved_size: usize,
        loaded_size: usize,
        kind: SavedDataType,
    ) -> Result<SavedData, StreamError> {
        let stream_size = self.size();
        let sub = self
            .data
            .subdata(offset, saved_size)
            .ok_or(StreamError::OutOfRange {
                offset,
                size: saved_size,
                stream_size,
            })?;

        Ok(SavedData::from_data(sub, loaded_size, kind))
    }
}

/// A [`Reader`] over the contents of a file.
///
/// Saved data handed out by this reader refers back to the file by
/// path and byte range, so it stays valid after the reader is gone.
#[derive(Debug)]
pub struct FileReader {
    path: Arc<Path>,
    inner: DataReader,
}

impl FileReader {
    /// Opens the file at the given `path` and operates on it from a
    /// memory mapping.
    ///
    /// This is the preferred option of working with relatively large
    /// files.
    pub fn open_mmap<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path)?;

        let data = if file.metadata()?.len() == 0 {
            Data::empty()
        } else {
            // SAFETY: Resource files are treated as read-only by us and
            // everyone else while they are in use, so the mapping is not
            // expected to change underneath us.
            let map = unsafe { MmapOptions::new().map(&file)? };
            Data::mapped(map)
        };

        Ok(Self::with_data(path.to_path_buf(), data))
    }

    /// Opens the file at the given `path` and reads its contents into
    /// heap-allocated memory.
    ///
    /// The file handle will be closed immediately after reading.
    pub fn open_heap<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let buf = fs::read(path)?;

        Ok(Self::with_data(path.to_path_buf(), Data::new(buf)))
    }

    fn with_data(path: PathBuf, data: Data) -> Self {
        Self {
            path: path.into(),
            inner: DataReader::new(data),
        }
    }

    /// Gets the path of the underlying file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Reader for FileReader {
    fn size(&self) -> usize {
        self.inner.size()
    }

    fn pos(&self) -> usize {
        self.inner.pos()
    }

    fn set_pos(&mut self, pos: usize) -> usize {
        self.inner.set_pos(pos)
    }

    fn saved_data(
        &self,
        offset: usize,
        saved_size: usize,
        loaded_size: usize,
        kind: SavedDataType,
    ) -> Result<SavedData, StreamError> {
        check_range(offset, saved_size, self.size())?;
        Ok(SavedData::from_file(
            self.path.clone(),
            offset,
            saved_size,
            loaded_size,
            kind,
        ))
    }
}
