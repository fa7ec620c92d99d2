use std::{fmt, ops::Deref, sync::Arc};

use memmap2::Mmap;

#[derive(Clone)]
enum Backing {
    Heap(Arc<[u8]>),
    Mapped(Arc<Mmap>),
}

impl Backing {
    #[inline]
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Heap(buf) => buf,
            Self::Mapped(map) => map,
        }
    }
}

/// An immutable, shared byte buffer.
///
/// Cloning and slicing are zero-copy; all views share the same
/// backing memory, which is either heap-allocated or a memory
/// mapping of a file.
#[derive(Clone)]
pub struct Data {
    backing: Backing,
    start: usize,
    len: usize,
}

impl Data {
    /// Creates a buffer which owns the given bytes.
    pub fn new(buf: Vec<u8>) -> Self {
        let len = buf.len();
        Self {
            backing: Backing::Heap(buf.into()),
            start: 0,
            len,
        }
    }

    /// Creates an empty buffer.
    #[inline]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn mapped(map: Mmap) -> Self {
        let len = map.len();
        Self {
            backing: Backing::Mapped(Arc::new(map)),
            start: 0,
            len,
        }
    }

    /// Gets the length of the buffer in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets the bytes of this buffer.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.backing.bytes()[self.start..self.start + self.len]
    }

    /// Creates a view of `len` bytes at `offset` into this buffer
    /// without copying.
    ///
    /// Returns [`None`] when the range is out of bounds.
    pub fn subdata(&self, offset: usize, len: usize) -> Option<Self> {
        let end = offset.checked_add(len)?;
        if end > self.len {
            return None;
        }

        Some(Self {
            backing: self.backing.clone(),
            start: self.start + offset,
            len,
        })
    }

    /// Whether `self` and `other` are views into the same backing memory.
    pub fn shares_memory(&self, other: &Data) -> bool {
        match (&self.backing, &other.backing) {
            (Backing::Heap(a), Backing::Heap(b)) => Arc::ptr_eq(a, b),
            (Backing::Mapped(a), Backing::Mapped(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Default for Data {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for Data {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl AsRef<[u8]> for Data {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for Data {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Data {}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data").field("len", &self.len).finish()
    }
}
