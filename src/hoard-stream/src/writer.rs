use std::{
    fs,
    io::{self, BufWriter, Seek, SeekFrom, Write},
    path::Path,
    sync::Arc,
};

use crate::{check_range, Data, SavedData, SavedDataType, StreamError};

/// A byte sink with a known size and a seekable position.
///
/// Writing at a position before the end overwrites existing bytes
/// and grows the stream once the end is reached.
pub trait Writer: Write + Send {
    /// Gets the total size of the stream in bytes.
    fn size(&self) -> usize;

    /// Gets the current position in the stream.
    fn pos(&self) -> usize;

    /// Moves to `pos`, clamped to the size of the stream.
    ///
    /// Returns the new position.
    fn set_pos(&mut self, pos: usize) -> usize;

    /// Hints that about `additional` more bytes will be written.
    fn reserve(&mut self, _additional: usize) {}

    /// Describes `saved_size` already written bytes at `offset` as
    /// [`SavedData`] which inflates to `loaded_size` bytes.
    fn saved_data(
        &self,
        offset: usize,
        saved_size: usize,
        loaded_size: usize,
        kind: SavedDataType,
    ) -> Result<SavedData, StreamError>;
}

/// A [`Writer`] into a growable in-memory buffer.
#[derive(Clone, Debug, Default)]
pub struct DataWriter {
    buf: Vec<u8>,
    pos: usize,
}

impl DataWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer which appends to the given buffer.
    pub fn with_buffer(buf: Vec<u8>) -> Self {
        let pos = buf.len();
        Self { buf, pos }
    }

    /// Gets the bytes written so far.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the writer and returns its buffer.
    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Consumes the writer and returns its buffer as shared [`Data`].
    #[inline]
    pub fn into_data(self) -> Data {
        Data::new(self.buf)
    }
}

impl Write for DataWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let overwrite = data.len().min(self.buf.len() - self.pos);
        let (head, tail) = data.split_at(overwrite);

        self.buf[self.pos..self.pos + overwrite].copy_from_slice(head);
        self.buf.extend_from_slice(tail);
        self.pos += data.len();

        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Writer for DataWriter {
    fn size(&self) -> usize {
        self.buf.len()
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn set_pos(&mut self, pos: usize) -> usize {
        self.pos = pos.min(self.size());
        self.pos
    }

    fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    fn saved_data(
        &self,
        offset: usize,
        saved_size: usize,
        loaded_size: usize,
        kind: SavedDataType,
    ) -> Result<SavedData, StreamError> {
        check_range(offset, saved_size, self.size())?;

        // The buffer is still mutable, so the range is copied out.
        let bytes = self.buf[offset..offset + saved_size].to_vec();
        Ok(SavedData::from_data(Data::new(bytes), loaded_size, kind))
    }
}

/// A [`Writer`] into a file on disk.
///
/// Saved data handed out by this writer refers to the file by path
/// and is only valid once the written bytes have been flushed.
#[derive(Debug)]
pub struct FileWriter {
    path: Arc<Path>,
    file: BufWriter<fs::File>,
    pos: usize,
    size: usize,
}

impl FileWriter {
    /// Creates or truncates the file at the given `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = fs::File::create(path)?;

        Ok(Self {
            path: path.into(),
            file: BufWriter::new(file),
            pos: 0,
            size: 0,
        })
    }

    /// Opens the file at the given `path` for appending, creating it
    /// when it does not exist yet.
    pub fn append<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        let size = file.seek(SeekFrom::End(0))? as usize;

        Ok(Self {
            path: path.into(),
            file: BufWriter::new(file),
            pos: size,
            size,
        })
    }

    /// Gets the path of the underlying file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Write for FileWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let written = self.file.write(data)?;
        self.pos += written;
        self.size = self.size.max(self.pos);

        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Writer for FileWriter {
    fn size(&self) -> usize {
        self.size
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn set_pos(&mut self, pos: usize) -> usize {
        let pos = pos.min(self.size);
        match self.file.seek(SeekFrom::Start(pos as u64)) {
            Ok(_) => self.pos = pos,
            Err(e) => log::error!("Failed to seek in '{}': {e}", self.path.display()),
        }

        self.pos
    }

    fn saved_data(
        &self,
        offset: usize,
        saved_size: usize,
        loaded_size: usize,
        kind: SavedDataType,
    ) -> Result<SavedData, StreamError> {
        check_range(offset, saved_size, self.size)?;
        Ok(SavedData::from_file(
            self.path.clone(),
            offset,
            saved_size,
            loaded_size,
            kind,
        ))
    }
}
