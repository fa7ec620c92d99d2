use std::io::{self, Read, Write};

/// The default chunk size for [`stream_copy`].
pub const DEFAULT_COPY_CHUNK: usize = 256 * 1024;

/// Copies up to `size` bytes from `reader` to `writer` in chunks of
/// `chunk_size` bytes, or [`DEFAULT_COPY_CHUNK`] when `0` is given.
///
/// Returns the number of bytes copied. A result below `size` means
/// that the source ran out of data or the sink stopped accepting it;
/// this is not treated as an error.
pub fn stream_copy<W, R>(writer: &mut W, reader: &mut R, size: usize, chunk_size: usize) -> usize
where
    W: Write + ?Sized,
    R: Read + ?Sized,
{
    let chunk_size = if chunk_size == 0 {
        DEFAULT_COPY_CHUNK
    } else {
        chunk_size
    };

    let mut buffer = vec![0; chunk_size.min(size)];
    let mut copied = 0;

    while copied < size {
        let want = chunk_size.min(size - copied);
        let got = match fill(reader, &mut buffer[..want]) {
            Ok(got) => got,
            Err(e) => {
                log::debug!("Stopping copy after {copied} bytes: {e}");
                break;
            }
        };

        if got == 0 {
            break;
        }

        if let Err(e) = writer.write_all(&buffer[..got]) {
            log::debug!("Stopping copy after {copied} bytes: {e}");
            break;
        }
        copied += got;

        // A short chunk marks the end of the source data.
        if got < want {
            break;
        }
    }

    copied
}

fn fill<R: Read + ?Sized>(reader: &mut R, mut buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while !buf.is_empty() {
        match reader.read(buf) {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                buf = &mut buf[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(total)
}
