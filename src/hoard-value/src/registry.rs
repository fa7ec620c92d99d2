use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::{Arc, OnceLock},
};

use hoard_stream::{Data, DataReader, DataWriter, Reader, Writer};
use hoard_utils::{binary, hash::djb2};

use crate::{builtins, Error, NativeType, TypedValue, Value, ValueType};

/// The maximum number of types a [`TypeRegistry`] can hold.
pub const MAX_TYPES: usize = 256;

/// The dense lookup index of a registered type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeIndex(u16);

impl TypeIndex {
    /// The index of the null type in every registry.
    pub const NULL: Self = Self(0);

    /// Gets the index as a number.
    #[inline]
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

/// Errors that may occur when registering types.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry already holds [`MAX_TYPES`] types.
    #[error("type registry is exhausted at {MAX_TYPES} types")]
    Exhausted,

    /// The persisted tag of a type collides with a registered one.
    #[error("persisted tag {tag:#010x} of '{name}' is already taken by '{existing}'")]
    DuplicateTag {
        name: &'static str,
        existing: &'static str,
        tag: u32,
    },

    /// The native type was already registered.
    #[error("native type of '{name}' is already registered as '{existing}'")]
    DuplicateNative {
        name: &'static str,
        existing: &'static str,
    },
}

/// A registered type: its descriptor and identities.
pub struct TypeEntry {
    index: TypeIndex,
    tag: u32,
    native: TypeId,
    ops: Box<dyn ValueType>,
}

impl TypeEntry {
    fn new(index: TypeIndex, ops: Box<dyn ValueType>) -> Self {
        Self {
            index,
            tag: djb2(ops.name().as_bytes()),
            native: ops.native(),
            ops,
        }
    }

    pub(crate) fn null() -> &'static Arc<TypeEntry> {
        static NULL: OnceLock<Arc<TypeEntry>> = OnceLock::new();
        NULL.get_or_init(|| Arc::new(TypeEntry::new(TypeIndex::NULL, NativeType::<()>::boxed())))
    }

    #[inline]
    pub fn index(&self) -> TypeIndex {
        self.index
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.ops.name()
    }

    /// The persisted tag, the DJB2 hash of the type's name.
    #[inline]
    pub fn tag(&self) -> u32 {
        self.tag
    }

    #[inline]
    pub fn native(&self) -> TypeId {
        self.native
    }

    #[inline]
    pub fn ops(&self) -> &dyn ValueType {
        &*self.ops
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry")
            .field("index", &self.index)
            .field("name", &self.name())
            .field("tag", &format_args!("{:#010x}", self.tag))
            .finish()
    }
}

/// The table of all types that values can hold.
///
/// A registry is populated during startup and treated as read-only
/// afterwards, when it is usually shared behind an [`Arc`].
pub struct TypeRegistry {
    entries: Vec<Arc<TypeEntry>>,
    tags: HashMap<u32, TypeIndex>,
    natives: HashMap<TypeId, TypeIndex>,
}

impl TypeRegistry {
    /// Creates a registry which holds only the null type.
    pub fn empty() -> Self {
        let null = TypeEntry::null().clone();

        let mut tags = HashMap::new();
        tags.insert(null.tag(), TypeIndex::NULL);
        let mut natives = HashMap::new();
        natives.insert(null.native(), TypeIndex::NULL);

        Self {
            entries: vec![null],
            tags,
            natives,
        }
    }

    /// Creates a registry with all builtin types.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        builtins::register(&mut registry);
        registry
    }

    /// Registers a type descriptor and returns its lookup index.
    pub fn try_register_type(&mut self, ops: Box<dyn ValueType>) -> Result<TypeIndex, RegistryError> {
        if self.entries.len() >= MAX_TYPES {
            return Err(RegistryError::Exhausted);
        }

        let index = TypeIndex(self.entries.len() as u16);
        let entry = TypeEntry::new(index, ops);

        if let Some(existing) = self.tags.get(&entry.tag()) {
            return Err(RegistryError::DuplicateTag {
                name: entry.name(),
                existing: self.entries[existing.get()].name(),
                tag: entry.tag(),
            });
        }
        if let Some(existing) = self.natives.get(&entry.native()) {
            return Err(RegistryError::DuplicateNative {
                name: entry.name(),
                existing: self.entries[existing.get()].name(),
            });
        }

        log::debug!("Registered type '{}' as {}", entry.name(), index.get());

        self.tags.insert(entry.tag(), index);
        self.natives.insert(entry.native(), index);
        self.entries.push(Arc::new(entry));

        Ok(index)
    }

    /// Registers a type descriptor.
    ///
    /// # Panics
    ///
    /// Panics when the registry is exhausted or the type collides
    /// with a registered one.
    pub fn register_type(&mut self, ops: Box<dyn ValueType>) -> TypeIndex {
        match self.try_register_type(ops) {
            Ok(index) => index,
            Err(e) => panic!("failed to register type: {e}"),
        }
    }

    /// Registers `T` through its [`NativeType`] descriptor.
    pub fn try_register<T: TypedValue>(&mut self) -> Result<TypeIndex, RegistryError> {
        self.try_register_type(NativeType::<T>::boxed())
    }

    /// Registers `T` through its [`NativeType`] descriptor.
    ///
    /// # Panics
    ///
    /// See [`TypeRegistry::register_type`].
    pub fn register<T: TypedValue>(&mut self) -> TypeIndex {
        self.register_type(NativeType::<T>::boxed())
    }

    /// Gets the number of registered types.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds nothing but the null type.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    #[inline]
    pub fn by_index(&self, index: TypeIndex) -> Option<&Arc<TypeEntry>> {
        self.entries.get(index.get())
    }

    #[inline]
    pub fn by_tag(&self, tag: u32) -> Option<&Arc<TypeEntry>> {
        self.tags.get(&tag).and_then(|&i| self.by_index(i))
    }

    #[inline]
    pub fn by_name(&self, name: &str) -> Option<&Arc<TypeEntry>> {
        self.by_tag(djb2(name.as_bytes()))
            .filter(|e| e.name() == name)
    }

    #[inline]
    pub fn by_native(&self, native: TypeId) -> Option<&Arc<TypeEntry>> {
        self.natives.get(&native).and_then(|&i| self.by_index(i))
    }

    /// Gets the entry of native type `T`, if registered.
    #[inline]
    pub fn entry_of<T: Any>(&self) -> Option<&Arc<TypeEntry>> {
        self.by_native(TypeId::of::<T>())
    }

    /// Iterates over all registered types in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeEntry>> {
        self.entries.iter()
    }

    /// Creates a value holding `payload`.
    ///
    /// # Panics
    ///
    /// Panics when `T` was never registered.
    pub fn create<T: Any + Send + Sync>(&self, payload: T) -> Value {
        match self.entry_of::<T>() {
            Some(entry) => Value::from_parts(entry.clone(), Box::new(payload)),
            None => panic!(
                "type '{}' is not registered",
                std::any::type_name::<T>()
            ),
        }
    }

    /// Reads a persisted type tag followed by a value of that type.
    pub fn load_typed(&self, reader: &mut dyn Reader) -> Result<Value, Error> {
        let tag = binary::uint32(reader)?;
        let entry = self.by_tag(tag).ok_or(Error::UnknownType(tag))?;

        entry.ops().load(reader, self)
    }

    /// Writes the persisted type tag of `value` followed by the value
    /// in its type's format.
    ///
    /// Types which persist as a stand-in value, like dicts, are written
    /// as that value instead.
    pub fn save_typed(&self, value: &Value, writer: &mut dyn Writer) -> Result<(), Error> {
        if let Some(stand_in) = value.entry().ops().persisted_as(value, self)? {
            return self.save_typed(&stand_in, writer);
        }

        binary::write_uint32(writer, value.type_tag())?;
        value.entry().ops().save(value, writer, self)
    }

    /// Reads one typed value from a buffer.
    pub fn load_data(&self, data: Data) -> Result<Value, Error> {
        let mut reader = DataReader::new(data);
        self.load_typed(&mut reader)
    }

    /// Persists one typed value into a fresh buffer.
    pub fn save_data(&self, value: &Value) -> Result<Data, Error> {
        let mut writer = DataWriter::new();
        self.save_typed(value, &mut writer)?;
        Ok(writer.into_data())
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}
