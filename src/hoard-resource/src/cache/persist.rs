//! The binary form of a cache.
//!
//! ```text
//! header:  cookie, count, count * (name, offset, size)
//! sources: cookie, count, count * path
//! data:    cookie, count * (name, bytes)
//! ```
//!
//! Offsets are relative to the end of the data cookie and point at
//! the bytes following each name.

use std::{io, path::PathBuf, sync::Arc};

use hoard_stream::{Data, DataWriter, Reader, SavedDataType, StreamError, Writer};
use hoard_utils::{binary, hash::stable_hash};
use hoard_value::Dict;

use super::CacheInner;
use crate::CacheError;

const CACHE_COOKIE: u64 = stable_hash(b"hoard::resource_cache@0");
const SOURCES_COOKIE: u64 = stable_hash(b"hoard::resource_cache::sources@0");
const DATA_COOKIE: u64 = stable_hash(b"hoard::resource_cache::data@0");

// Width of a persisted size prefix.
const SIZE_LEN: usize = 8;

fn eof(e: io::Error) -> CacheError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        CacheError::Truncated(e.to_string())
    } else {
        CacheError::Io(e)
    }
}

fn expect_cookie(reader: &mut dyn Reader, expected: u64, block: &'static str) -> Result<(), CacheError> {
    if binary::uint64(reader).map_err(eof)? == expected {
        Ok(())
    } else {
        Err(CacheError::BadCookie(block))
    }
}

impl CacheInner {
    fn snapshot(&self) -> Result<(Vec<(Arc<str>, Data)>, Vec<PathBuf>), CacheError> {
        let (mut records, sources) = {
            let table = self.table.lock();
            let records: Vec<_> = table
                .entries
                .values()
                .map(|info| (info.name.clone(), info.saved.clone()))
                .collect();
            (records, table.sources.iter().cloned().collect())
        };
        records.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let records = records
            .into_iter()
            .map(|(name, saved)| Ok((name, saved.loaded_data()?)))
            .collect::<Result<_, StreamError>>()?;

        Ok((records, sources))
    }

    pub(super) fn save(&self, writer: &mut dyn Writer) -> Result<(), CacheError> {
        let (records, sources) = self.snapshot()?;

        let data_len: usize = records
            .iter()
            .map(|(name, data)| SIZE_LEN + name.len() + data.len())
            .sum();
        writer.reserve(data_len + records.len() * 64);

        binary::write_cookie(writer, CACHE_COOKIE)?;
        binary::write_size(writer, records.len())?;
        let mut offset = 0;
        for (name, data) in &records {
            offset += SIZE_LEN + name.len();
            binary::write_string(writer, name)?;
            binary::write_size(writer, offset)?;
            binary::write_size(writer, data.len())?;
            offset += data.len();
        }

        binary::write_cookie(writer, SOURCES_COOKIE)?;
        binary::write_seq(writer, &sources, |w, path| {
            binary::write_string(w, &path.to_string_lossy())
        })?;

        binary::write_cookie(writer, DATA_COOKIE)?;
        for (name, data) in &records {
            binary::write_string(writer, name)?;
            writer.write_all(data)?;
        }

        log::debug!("Saved {} resources", records.len());
        Ok(())
    }

    pub(super) fn save_to_data(&self) -> Result<Data, CacheError> {
        let mut writer = DataWriter::new();
        self.save(&mut writer)?;
        Ok(writer.into_data())
    }

    pub(super) fn save_to_dict(&self, dict: &mut Dict) -> Result<(), CacheError> {
        let (records, _) = self.snapshot()?;
        for (name, data) in records {
            let value = self.registry.load_data(data)?;
            dict.set(name, value);
        }

        Ok(())
    }

    pub(super) fn add_resources_from(&self, reader: &mut dyn Reader) -> Result<usize, CacheError> {
        expect_cookie(reader, CACHE_COOKIE, "header")?;
        let count = binary::size(reader).map_err(eof)?;
        let mut records = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let name = binary::string(reader).map_err(eof)?;
            let offset = binary::size(reader).map_err(eof)?;
            let size = binary::size(reader).map_err(eof)?;
            records.push((name, offset, size));
        }

        expect_cookie(reader, SOURCES_COOKIE, "sources")?;
        let sources = binary::seq(reader, |r| binary::string(r).map(PathBuf::from)).map_err(eof)?;

        expect_cookie(reader, DATA_COOKIE, "data")?;
        let data_start = reader.pos();

        let mut saved = Vec::with_capacity(records.len());
        let mut end = data_start;
        for (name, offset, size) in records {
            let truncated = || CacheError::Truncated(format!("data of '{name}' exceeds the stream"));

            let start = data_start.checked_add(offset).ok_or_else(truncated)?;
            let view = reader
                .saved_data(start, size, size, SavedDataType::NONE)
                .map_err(|e| match e {
                    StreamError::OutOfRange { .. } => truncated(),
                    e => e.into(),
                })?;

            end = end.max(start + size);
            saved.push((Arc::<str>::from(name), view));
        }
        reader.set_pos(end);

        let total = saved.len();
        let added = self.install(saved, sources);
        log::debug!("Read {total} resources, {added} new");

        Ok(added)
    }
}
