//! Builtin value types and their conversions.

use std::{any::TypeId, fmt};

use hoard_stream::{Data, Reader, SavedData, SavedDataType, Writer};
use hoard_utils::binary;

use crate::{Dict, Error, TypeRegistry, TypedValue, Value};

pub(crate) fn register(registry: &mut TypeRegistry) {
    registry.register::<bool>();
    registry.register::<i32>();
    registry.register::<f64>();
    registry.register::<String>();
    registry.register::<Vec<i32>>();
    registry.register::<Vec<String>>();
    registry.register::<Vec<Value>>();
    registry.register::<Dict>();
    registry.register::<Data>();
    registry.register::<SavedData>();
}

impl TypedValue for () {
    const NAME: &'static str = "null";

    fn value_eq(&self, _other: &Self) -> bool {
        true
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null")
    }

    fn load(_reader: &mut dyn Reader, _registry: &TypeRegistry) -> Result<Self, Error> {
        Ok(())
    }

    fn save(&self, _writer: &mut dyn Writer, _registry: &TypeRegistry) -> Result<(), Error> {
        Ok(())
    }
}

impl TypedValue for bool {
    const NAME: &'static str = "bool";

    fn value_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }

    fn load(reader: &mut dyn Reader, _registry: &TypeRegistry) -> Result<Self, Error> {
        binary::boolean(reader).map_err(Into::into)
    }

    fn save(&self, writer: &mut dyn Writer, _registry: &TypeRegistry) -> Result<(), Error> {
        binary::write_boolean(writer, *self).map_err(Into::into)
    }

    fn convert_from(value: &Value, _registry: &TypeRegistry) -> Option<Self> {
        if let Some(&v) = value.get::<i32>() {
            Some(v != 0)
        } else if let Some(v) = value.get::<String>() {
            v.parse().ok()
        } else {
            None
        }
    }
}

impl TypedValue for i32 {
    const NAME: &'static str = "int32";

    fn value_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }

    fn load(reader: &mut dyn Reader, _registry: &TypeRegistry) -> Result<Self, Error> {
        binary::int32(reader).map_err(Into::into)
    }

    fn save(&self, writer: &mut dyn Writer, _registry: &TypeRegistry) -> Result<(), Error> {
        binary::write_int32(writer, *self).map_err(Into::into)
    }

    fn convert_from(value: &Value, _registry: &TypeRegistry) -> Option<Self> {
        if let Some(&v) = value.get::<bool>() {
            Some(v as i32)
        } else if let Some(&v) = value.get::<f64>() {
            // Only exactly representable values convert.
            (v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64).then_some(v as i32)
        } else if let Some(v) = value.get::<String>() {
            v.trim().parse().ok()
        } else {
            None
        }
    }
}

impl TypedValue for f64 {
    const NAME: &'static str = "float64";

    fn value_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }

    fn load(reader: &mut dyn Reader, _registry: &TypeRegistry) -> Result<Self, Error> {
        binary::float64(reader).map_err(Into::into)
    }

    fn save(&self, writer: &mut dyn Writer, _registry: &TypeRegistry) -> Result<(), Error> {
        binary::write_float64(writer, *self).map_err(Into::into)
    }

    fn convert_from(value: &Value, _registry: &TypeRegistry) -> Option<Self> {
        if let Some(&v) = value.get::<i32>() {
            Some(v.into())
        } else if let Some(&v) = value.get::<bool>() {
            Some(if v { 1.0 } else { 0.0 })
        } else if let Some(v) = value.get::<String>() {
            v.trim().parse().ok()
        } else {
            None
        }
    }
}

fn load_string(reader: &mut dyn Reader) -> Result<String, Error> {
    let len = binary::size(reader)?;
    let bytes = binary::bytes(reader, len)?;
    String::from_utf8(bytes).map_err(Into::into)
}

impl TypedValue for String {
    const NAME: &'static str = "string";

    fn value_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }

    fn load(reader: &mut dyn Reader, _registry: &TypeRegistry) -> Result<Self, Error> {
        load_string(reader)
    }

    fn save(&self, writer: &mut dyn Writer, _registry: &TypeRegistry) -> Result<(), Error> {
        binary::write_string(writer, self).map_err(Into::into)
    }

    fn convert_from(value: &Value, _registry: &TypeRegistry) -> Option<Self> {
        if let Some(v) = value.get::<bool>() {
            Some(v.to_string())
        } else if let Some(v) = value.get::<i32>() {
            Some(v.to_string())
        } else if let Some(v) = value.get::<f64>() {
            Some(v.to_string())
        } else {
            None
        }
    }
}

impl TypedValue for Vec<i32> {
    const NAME: &'static str = "int32_list";

    fn value_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self).finish()
    }

    fn load(reader: &mut dyn Reader, _registry: &TypeRegistry) -> Result<Self, Error> {
        binary::seq(reader, |r| binary::int32(r)).map_err(Into::into)
    }

    fn save(&self, writer: &mut dyn Writer, _registry: &TypeRegistry) -> Result<(), Error> {
        binary::write_seq(writer, self, |w, &v| binary::write_int32(w, v)).map_err(Into::into)
    }

    fn child_count(&self) -> usize {
        self.len()
    }
}

impl TypedValue for Vec<String> {
    const NAME: &'static str = "string_list";

    fn value_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self).finish()
    }

    fn load(reader: &mut dyn Reader, _registry: &TypeRegistry) -> Result<Self, Error> {
        let count = binary::size(reader)?;

        let mut out = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            out.push(load_string(reader)?);
        }
        Ok(out)
    }

    fn save(&self, writer: &mut dyn Writer, _registry: &TypeRegistry) -> Result<(), Error> {
        binary::write_seq(writer, self, |w, v| binary::write_string(w, v)).map_err(Into::into)
    }

    fn child_count(&self) -> usize {
        self.len()
    }
}

impl TypedValue for Vec<Value> {
    const NAME: &'static str = "value_list";

    fn value_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self).finish()
    }

    fn load(reader: &mut dyn Reader, registry: &TypeRegistry) -> Result<Self, Error> {
        let count = binary::size(reader)?;

        let mut out = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            out.push(registry.load_typed(reader)?);
        }
        Ok(out)
    }

    fn save(&self, writer: &mut dyn Writer, registry: &TypeRegistry) -> Result<(), Error> {
        binary::write_size(writer, self.len())?;
        for v in self {
            registry.save_typed(v, writer)?;
        }
        Ok(())
    }

    fn convert_from(value: &Value, registry: &TypeRegistry) -> Option<Self> {
        if let Some(v) = value.get::<Vec<i32>>() {
            Some(v.iter().map(|&i| registry.create(i)).collect())
        } else if let Some(v) = value.get::<Vec<String>>() {
            Some(v.iter().map(|s| registry.create(s.clone())).collect())
        } else {
            None
        }
    }

    fn child_at(&self, index: usize) -> Option<Value> {
        self.get(index).cloned()
    }

    fn child_count(&self) -> usize {
        self.len()
    }
}

impl TypedValue for Data {
    const NAME: &'static str = "data";

    fn value_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<data: {} bytes>", self.len())
    }

    fn load(reader: &mut dyn Reader, _registry: &TypeRegistry) -> Result<Self, Error> {
        let len = binary::size(reader)?;
        binary::bytes(reader, len).map(Data::new).map_err(Into::into)
    }

    fn save(&self, writer: &mut dyn Writer, _registry: &TypeRegistry) -> Result<(), Error> {
        binary::write_size(writer, self.len())?;
        writer.write_all(self).map_err(Into::into)
    }

    fn convert_from(value: &Value, _registry: &TypeRegistry) -> Option<Self> {
        let saved = value.get::<SavedData>()?;
        match saved.loaded_data() {
            Ok(data) => Some(data),
            Err(e) => {
                log::warn!("Failed to materialize saved data: {e}");
                None
            }
        }
    }
}

impl TypedValue for SavedData {
    const NAME: &'static str = "saved_data";

    fn value_eq(&self, other: &Self) -> bool {
        if self.kind() != other.kind() || self.loaded_size() != other.loaded_size() {
            return false;
        }

        match (self.saved_data(), other.saved_data()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<saved_data: {} of {} bytes, {:?}>",
            self.saved_size(),
            self.loaded_size(),
            self.kind()
        )
    }

    fn load(reader: &mut dyn Reader, _registry: &TypeRegistry) -> Result<Self, Error> {
        let kind = SavedDataType::from_bits_truncate(binary::uint32(reader)?);
        let loaded_size = binary::size(reader)?;
        let saved_size = binary::size(reader)?;

        // Hand out a view of the stream instead of reading the bytes.
        let offset = reader.pos();
        let saved = reader.saved_data(offset, saved_size, loaded_size, kind)?;
        reader.set_pos(offset + saved_size);

        Ok(saved)
    }

    fn save(&self, writer: &mut dyn Writer, _registry: &TypeRegistry) -> Result<(), Error> {
        let bytes = self.saved_data()?;

        binary::write_uint32(writer, self.kind().bits())?;
        binary::write_size(writer, self.loaded_size())?;
        binary::write_size(writer, bytes.len())?;
        writer.write_all(&bytes).map_err(Into::into)
    }

    fn convert_from(value: &Value, _registry: &TypeRegistry) -> Option<Self> {
        let data = value.get::<Data>()?;
        Some(SavedData::from_data(
            data.clone(),
            data.len(),
            SavedDataType::NONE,
        ))
    }
}

/// Dict bodies at least this large are compressed when persisted.
pub(crate) const DICT_COMPRESS_THRESHOLD: usize = 256;

pub(crate) fn dict_convert_to(dict: &Dict, target: TypeId, registry: &TypeRegistry) -> Option<Value> {
    if target != TypeId::of::<Data>() && target != TypeId::of::<SavedData>() {
        return None;
    }

    let converted = if target == TypeId::of::<Data>() {
        dict.to_data(registry).map(|data| registry.create(data))
    } else {
        dict.to_saved(registry).map(|saved| registry.create(saved))
    };

    match converted {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Failed to persist dict: {e}");
            None
        }
    }
}

pub(crate) fn dict_convert_from(value: &Value, registry: &TypeRegistry) -> Option<Dict> {
    let result = if let Some(data) = value.get::<Data>() {
        Dict::from_data(data.clone(), registry)
    } else if let Some(saved) = value.get::<SavedData>() {
        if !saved.kind().contains(SavedDataType::DICT) {
            return None;
        }
        Dict::from_saved(saved, registry)
    } else {
        return None;
    };

    match result {
        Ok(dict) => Some(dict),
        Err(e) => {
            log::warn!("Failed to decode persisted dict: {e}");
            None
        }
    }
}

