use std::io::{Read, Write};

use hoard_stream::{
    inflate_limit, Data, DataReader, FileReader, FileWriter, Reader, SavedData, SavedDataType,
    StreamError, Writer, MAX_INFLATE_RATIO,
};
use tempfile::NamedTempFile;

#[test]
fn memory_view_is_zero_copy() -> Result<(), StreamError> {
    let data = Data::new(b"hello, saved world".to_vec());
    let reader = DataReader::new(data.clone());

    let saved = reader.saved_data(7, 5, 5, SavedDataType::NONE)?;
    assert!(!saved.is_file_backed());

    let loaded = saved.loaded_data()?;
    assert_eq!(&*loaded, b"saved");
    assert!(loaded.shares_memory(&data));

    Ok(())
}

#[test]
fn memory_view_out_of_range() {
    let reader = DataReader::new(Data::new(vec![0; 16]));

    assert!(matches!(
        reader.saved_data(10, 7, 7, SavedDataType::NONE),
        Err(StreamError::OutOfRange {
            offset: 10,
            size: 7,
            stream_size: 16
        })
    ));
}

#[test]
fn file_region_is_lazy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not-there-yet.bin");

    // Describing a huge region of a file that does not exist must not
    // touch the filesystem at all.
    let gigabyte = 1 << 30;
    let saved = SavedData::from_file(path.as_path(), 0, gigabyte, gigabyte, SavedDataType::NONE);
    assert!(saved.is_file_backed());
    assert_eq!(saved.saved_size(), gigabyte);
    assert_eq!(saved.loaded_size(), gigabyte);

    // Only loading does, and then it fails.
    assert!(matches!(saved.loaded_reader(), Err(StreamError::Io(_))));
}

#[test]
fn file_view_reads_on_load() -> Result<(), StreamError> {
    let mut temp = NamedTempFile::new()?;
    temp.write_all(b"0123456789abcdef")?;
    temp.flush()?;

    let reader = FileReader::open_mmap(temp.path())?;
    let saved = reader.saved_data(10, 6, 6, SavedDataType::NONE)?;
    drop(reader);

    assert!(saved.is_file_backed());

    let mut loaded = saved.loaded_reader()?;
    let mut out = String::new();
    loaded.read_to_string(&mut out)?;
    assert_eq!(out, "abcdef");

    Ok(())
}

#[test]
fn compressed_round_trip() -> Result<(), StreamError> {
    let payload = b"compress me, compress me, compress me, compress me".repeat(8);

    let saved = SavedData::compress(&payload, SavedDataType::DICT)?;
    assert!(saved.kind().contains(SavedDataType::ZLIB_COMPRESSED));
    assert!(saved.kind().contains(SavedDataType::DICT));
    assert!(saved.saved_size() < saved.loaded_size());

    assert_eq!(&*saved.loaded_data()?, &payload[..]);

    Ok(())
}

#[test]
fn compressed_size_mismatch() -> Result<(), StreamError> {
    let payload = b"ten bytes!";
    let compressed = SavedData::compress(payload, SavedDataType::NONE)?;

    let wrong = SavedData::from_data(
        compressed.saved_data()?,
        payload.len() + 4,
        compressed.kind(),
    );
    assert!(matches!(
        wrong.loaded_data(),
        Err(StreamError::DecompressedSizeMismatch {
            expected: 14,
            actual: 10
        })
    ));

    Ok(())
}

#[test]
fn corrupt_inflated_size_is_rejected() -> Result<(), StreamError> {
    let compressed = SavedData::compress(&[7; 64], SavedDataType::NONE)?;
    let saved_size = compressed.saved_size();

    let corrupt = SavedData::from_data(compressed.saved_data()?, usize::MAX / 2, compressed.kind());
    assert!(matches!(
        corrupt.loaded_data(),
        Err(StreamError::ImplausibleSize { saved_size: s, limit, .. })
            if s == saved_size && limit == inflate_limit(saved_size)
    ));

    // Sizes within reach of the stream still inflate.
    let at_limit = SavedData::from_data(compressed.saved_data()?, 64, compressed.kind());
    assert_eq!(&*at_limit.loaded_data()?, &[7; 64][..]);
    assert!(64 <= inflate_limit(saved_size));
    assert_eq!(inflate_limit(0), 8 * MAX_INFLATE_RATIO);

    Ok(())
}

#[test]
fn file_writer_saved_data() -> Result<(), StreamError> {
    let temp = NamedTempFile::new()?;

    let mut writer = FileWriter::create(temp.path())?;
    writer.write_all(b"header")?;
    let offset = writer.pos();
    writer.write_all(b"payload")?;
    writer.flush()?;

    let saved = writer.saved_data(offset, 7, 7, SavedDataType::NONE)?;
    assert!(saved.is_file_backed());
    assert_eq!(&*saved.loaded_data()?, b"payload");

    Ok(())
}
