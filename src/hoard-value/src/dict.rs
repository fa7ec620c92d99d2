use std::{
    any::{Any, TypeId},
    fmt,
    ops::Deref,
    sync::Arc,
};

use hoard_stream::{Data, DataReader, DataWriter, Reader, SavedData, SavedDataType, Writer};
use hoard_utils::binary;
use indexmap::IndexMap;

use crate::{
    builtins::{self, DICT_COMPRESS_THRESHOLD},
    Error, TypeRegistry, TypedValue, Value,
};

/// A mapping of unique names to values.
///
/// Dicts preserve insertion order for enumeration and are values
/// themselves, so they nest arbitrarily deep.
///
/// The dict body is a count followed by `(name, typed value)` pairs.
/// As a typed value, a dict is persisted as saved data tagged with
/// [`SavedDataType::DICT`] which wraps its body, compressed once the
/// body is large enough. Loading it back yields that saved data, and
/// the body is only decoded on conversion to a dict.
#[derive(Clone, Default)]
pub struct Dict {
    inner: IndexMap<Arc<str>, Value>,
}

impl Dict {
    /// Creates an empty dict.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the child value named `name`.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner.get(name)
    }

    /// Gets the child named `name` converted to native type `T`.
    ///
    /// Returns [`None`] for missing children and children which are
    /// not representable as `T`.
    pub fn get_as<T: Any>(&self, name: &str, registry: &TypeRegistry) -> Option<Value> {
        self.get(name)?.try_convert::<T>(registry)
    }

    /// Sets the child named `name` and returns the value it replaced.
    pub fn set(&mut self, name: impl Into<Arc<str>>, value: Value) -> Option<Value> {
        self.inner.insert(name.into(), value)
    }

    /// Sets the child named `name` unless it is already present.
    ///
    /// Returns whether the value was inserted.
    pub fn try_set(&mut self, name: impl Into<Arc<str>>, value: Value) -> bool {
        match self.inner.entry(name.into()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(e) => {
                e.insert(value);
                true
            }
        }
    }

    /// Removes the child named `name`, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.inner.shift_remove(name)
    }

    /// Moves all children of `other` into `self`, replacing children
    /// of the same name.
    pub fn merge(&mut self, other: Dict) {
        self.inner.reserve(other.len());
        self.inner.extend(other.inner);
    }

    /// Gets a snapshot of all child names.
    pub fn child_names(&self) -> Vec<Arc<str>> {
        self.inner.keys().cloned().collect()
    }

    /// Reads a dict body.
    pub fn load(reader: &mut dyn Reader, registry: &TypeRegistry) -> Result<Self, Error> {
        let count = binary::size(reader)?;

        let mut dict = Self::new();
        dict.inner.reserve(count.min(1024));
        for _ in 0..count {
            let name = binary::string(reader)?;
            let value = registry.load_typed(reader)?;
            dict.set(name, value);
        }

        Ok(dict)
    }

    /// Writes the dict body.
    pub fn save(&self, writer: &mut dyn Writer, registry: &TypeRegistry) -> Result<(), Error> {
        binary::write_size(writer, self.len())?;
        for (name, value) in self {
            binary::write_string(writer, name)?;
            registry.save_typed(value, writer)?;
        }

        Ok(())
    }

    /// Reads a dict body from a buffer.
    pub fn from_data(data: Data, registry: &TypeRegistry) -> Result<Self, Error> {
        let mut reader = DataReader::new(data);
        Self::load(&mut reader, registry)
    }

    /// Materializes saved data and reads a dict body from it.
    pub fn from_saved(saved: &SavedData, registry: &TypeRegistry) -> Result<Self, Error> {
        if !saved.kind().contains(SavedDataType::DICT) {
            log::debug!("Decoding saved data without dict tag as dict");
        }

        let mut reader = saved.loaded_reader()?;
        Self::load(&mut reader, registry)
    }

    /// Persists the dict body as saved data tagged as a dict.
    pub fn to_saved(&self, registry: &TypeRegistry) -> Result<SavedData, Error> {
        let data = self.to_data(registry)?;
        if data.len() >= DICT_COMPRESS_THRESHOLD {
            Ok(SavedData::compress(&data, SavedDataType::DICT)?)
        } else {
            let len = data.len();
            Ok(SavedData::from_data(data, len, SavedDataType::DICT))
        }
    }

    /// Persists the dict body into a fresh buffer.
    pub fn to_data(&self, registry: &TypeRegistry) -> Result<Data, Error> {
        let mut writer = DataWriter::new();
        self.save(&mut writer, registry)?;
        Ok(writer.into_data())
    }

    /// Decodes all children persisted as dicts, recursively.
    ///
    /// Children which are dicts in saved form, and such dicts inside
    /// value lists, are replaced by the dicts they encode.
    pub fn expanded(&self, registry: &TypeRegistry) -> Result<Self, Error> {
        self.iter()
            .map(|(name, child)| Ok((name.clone(), expand(child, registry)?)))
            .collect()
    }
}

fn expand(value: &Value, registry: &TypeRegistry) -> Result<Value, Error> {
    if let Some(dict) = value.get::<Dict>() {
        return Ok(registry.create(dict.expanded(registry)?));
    }
    if let Some(saved) = value.get::<SavedData>() {
        if saved.kind().contains(SavedDataType::DICT) {
            let dict = Dict::from_saved(saved, registry)?;
            return Ok(registry.create(dict.expanded(registry)?));
        }
    }
    if let Some(list) = value.get::<Vec<Value>>() {
        let list = list
            .iter()
            .map(|v| expand(v, registry))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(registry.create(list));
    }

    Ok(value.clone())
}

impl Deref for Dict {
    type Target = IndexMap<Arc<str>, Value>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl PartialEq for Dict {
    /// Dicts are equal when they hold equal children under the same
    /// names, regardless of order.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(name, value)| other.get(name).is_some_and(|v| v == value))
    }
}

impl fmt::Debug for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.iter()).finish()
    }
}

impl FromIterator<(Arc<str>, Value)> for Dict {
    fn from_iter<I: IntoIterator<Item = (Arc<str>, Value)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Dict {
    type Item = (Arc<str>, Value);
    type IntoIter = <IndexMap<Arc<str>, Value> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dict {
    type Item = (&'a Arc<str>, &'a Value);
    type IntoIter = <&'a IndexMap<Arc<str>, Value> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl TypedValue for Dict {
    const NAME: &'static str = "dict";

    fn value_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }

    fn persisted_as(&self, registry: &TypeRegistry) -> Result<Option<Value>, Error> {
        self.to_saved(registry).map(|saved| Some(registry.create(saved)))
    }

    fn convert_to(&self, target: TypeId, registry: &TypeRegistry) -> Option<Value> {
        builtins::dict_convert_to(self, target, registry)
    }

    fn convert_from(value: &Value, registry: &TypeRegistry) -> Option<Self> {
        builtins::dict_convert_from(value, registry)
    }

    fn child(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn child_names(&self) -> Vec<Arc<str>> {
        Dict::child_names(self)
    }

    fn child_at(&self, index: usize) -> Option<Value> {
        self.inner.get_index(index).map(|(_, v)| v.clone())
    }

    fn child_count(&self) -> usize {
        self.len()
    }
}
