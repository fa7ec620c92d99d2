//! Utilities for reading and writing structured binary data.
//!
//! All integers are little-endian. Sizes and lengths are persisted
//! as 64-bit values regardless of the host's pointer width.

use std::{
    io::{self, Read, Write},
    mem,
};

#[inline]
fn invalid_data(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Reads a 64-bit cookie from the stream and checks it against
/// the `expected` value.
#[inline]
pub fn cookie<R: Read + ?Sized>(data: &mut R, expected: u64) -> io::Result<()> {
    if uint64(data)? == expected {
        Ok(())
    } else {
        Err(invalid_data("Cookie mismatch in input stream"))
    }
}

/// Writes a 64-bit cookie to the stream.
#[inline]
pub fn write_cookie<W: Write + ?Sized>(out: &mut W, cookie: u64) -> io::Result<()> {
    write_uint64(out, cookie)
}

/// Parses an unsigned byte off the data stream.
#[inline]
pub fn uint8<R: Read + ?Sized>(data: &mut R) -> io::Result<u8> {
    let mut v = [0; 1];
    data.read_exact(&mut v)?;
    Ok(v[0])
}

/// Writes an unsigned byte to the data stream.
#[inline]
pub fn write_uint8<W: Write + ?Sized>(out: &mut W, v: u8) -> io::Result<()> {
    out.write_all(&[v])
}

/// Reads a [`bool`] from the data stream.
#[inline]
pub fn boolean<R: Read + ?Sized>(data: &mut R) -> io::Result<bool> {
    uint8(data).map(|v| v != 0)
}

/// Writes a [`bool`] to the data stream.
#[inline]
pub fn write_boolean<W: Write + ?Sized>(out: &mut W, v: bool) -> io::Result<()> {
    out.write_all(&[v as u8])
}

macro_rules! int_read_impl {
    ($($fn:ident() -> $ty:ty),* $(,)*) => {
        $(
            #[doc = concat!("Parses a [`", stringify!($ty), "`] value off the data stream.")]
            #[inline]
            pub fn $fn<R: io::Read + ?Sized>(data: &mut R) -> io::Result<$ty> {
                let mut v = [0; mem::size_of::<$ty>()];
                data.read_exact(&mut v)?;
                Ok(<$ty>::from_le_bytes(v))
        }
        )*
    };
}

macro_rules! int_write_impl {
    ($($fn:ident($ty:ty)),* $(,)*) => {
        $(
            #[doc = concat!("Writes a [`", stringify!($ty), "`] value to the data stream.")]
            #[inline]
            pub fn $fn<W: Write + ?Sized>(out: &mut W, v: $ty) -> io::Result<()> {
                out.write_all(&v.to_le_bytes())
            }
        )*
    };
}

int_read_impl! {
    uint32() -> u32,
    int32() -> i32,
    uint64() -> u64,
    int64() -> i64,
    float64() -> f64,
}

int_write_impl! {
    write_uint32(u32),
    write_int32(i32),
    write_uint64(u64),
    write_int64(i64),
    write_float64(f64),
}

/// Parses a persisted size value off the data stream.
///
/// Fails when the value does not fit into a [`usize`] on this host.
#[inline]
pub fn size<R: Read + ?Sized>(data: &mut R) -> io::Result<usize> {
    let v = uint64(data)?;
    usize::try_from(v).map_err(|_| invalid_data("Size value exceeds address space"))
}

/// Writes a size value to the data stream.
#[inline]
pub fn write_size<W: Write + ?Sized>(out: &mut W, v: usize) -> io::Result<()> {
    write_uint64(out, v as u64)
}

/// Reads exactly `len` bytes off the data stream.
///
/// Fails on premature EOF rather than returning a short buffer.
#[inline]
pub fn bytes<R: Read + ?Sized>(data: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut v = Vec::with_capacity(len.min(1 << 20));
    data.take(len as u64).read_to_end(&mut v)?;

    if v.len() != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "Premature EOF while reading byte data",
        ));
    }

    Ok(v)
}

/// Parses a size-prefixed string off the data stream.
///
/// Fails if the string is not valid UTF-8.
#[inline]
pub fn string<R: Read + ?Sized>(data: &mut R) -> io::Result<String> {
    let len = size(data)?;
    let v = bytes(data, len)?;

    String::from_utf8(v).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Writes a size-prefixed string to the output stream.
#[inline]
pub fn write_string<W: Write + ?Sized>(out: &mut W, v: &str) -> io::Result<()> {
    write_size(out, v.len())?;
    out.write_all(v.as_bytes())
}

/// Parses a size-prefixed sequence using the given parser.
///
/// The parser function freely defines how to parse one element
/// of the sequence.
#[inline]
pub fn seq<F, R, T>(data: &mut R, mut f: F) -> io::Result<Vec<T>>
where
    F: FnMut(&mut R) -> io::Result<T>,
    R: Read + ?Sized,
{
    let count = size(data)?;

    // Don't trust the count for the allocation, a corrupt stream
    // fails on EOF long before reaching it.
    let mut out = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let element = f(data)?;
        out.push(element);
    }
    Ok(out)
}

/// Writes a size-prefixed sequence using the given writer function.
#[inline]
pub fn write_seq<F, T, W>(out: &mut W, seq: &[T], mut f: F) -> io::Result<()>
where
    F: FnMut(&mut W, &T) -> io::Result<()>,
    W: Write + ?Sized,
{
    write_size(out, seq.len())?;
    for v in seq {
        f(out, v)?;
    }

    Ok(())
}
