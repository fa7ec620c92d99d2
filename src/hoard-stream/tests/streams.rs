use std::io::{self, Read, Write};

use hoard_stream::{stream_copy, Data, DataReader, DataWriter, Reader, Writer};

#[test]
fn reader_position_is_clamped() {
    let mut reader = DataReader::new(Data::new(vec![1, 2, 3, 4]));

    assert_eq!(reader.set_pos(100), 4);
    assert_eq!(reader.pos(), 4);

    let mut buf = [0; 2];
    assert_eq!(reader.read(&mut buf).unwrap(), 0);

    reader.set_pos(3);
    assert_eq!(reader.read(&mut buf).unwrap(), 1);
    assert_eq!(buf[0], 4);
}

#[test]
fn writer_overwrites_then_appends() {
    let mut writer = DataWriter::new();
    writer.write_all(b"abcdef").unwrap();

    assert_eq!(writer.set_pos(42), 6);
    writer.set_pos(4);
    writer.write_all(b"XYZ").unwrap();

    assert_eq!(writer.size(), 7);
    assert_eq!(writer.pos(), 7);
    assert_eq!(writer.as_slice(), b"abcdXYZ");
}

#[test]
fn writer_saved_data_copies() {
    let mut writer = DataWriter::new();
    writer.write_all(b"keep this").unwrap();

    let saved = writer
        .saved_data(5, 4, 4, Default::default())
        .unwrap();
    writer.set_pos(5);
    writer.write_all(b"gone").unwrap();

    assert_eq!(&*saved.loaded_data().unwrap(), b"this");
}

#[test]
fn copy_full() {
    let payload: Vec<u8> = (0..=255).cycle().take(10_000).collect();
    let mut reader = DataReader::new(Data::new(payload.clone()));
    let mut writer = DataWriter::new();

    assert_eq!(stream_copy(&mut writer, &mut reader, payload.len(), 333), payload.len());
    assert_eq!(writer.as_slice(), &payload[..]);
}

#[test]
fn copy_stops_at_end_of_data() {
    let mut reader = DataReader::new(Data::new(vec![7; 100]));
    let mut writer = DataWriter::new();

    assert_eq!(stream_copy(&mut writer, &mut reader, 1000, 0), 100);
    assert_eq!(writer.size(), 100);
}

struct Failing(usize);

impl Write for Failing {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.0 == 0 {
            return Err(io::Error::other("sink closed"));
        }
        let n = buf.len().min(self.0);
        self.0 -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn copy_stops_on_write_failure() {
    let mut reader = DataReader::new(Data::new(vec![0; 64]));
    let mut sink = Failing(20);

    // The second chunk only fits partially and is not counted.
    assert_eq!(stream_copy(&mut sink, &mut reader, 64, 16), 16);
}
