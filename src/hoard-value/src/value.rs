use std::{
    any::{Any, TypeId},
    fmt,
    sync::{Arc, OnceLock},
};

use crate::{Error, TypeEntry, TypeIndex, TypeRegistry};

struct Cell {
    entry: Arc<TypeEntry>,
    payload: Option<Box<dyn Any + Send + Sync>>,
}

impl Drop for Cell {
    fn drop(&mut self) {
        // The type's cleanup runs before the payload storage is freed.
        if let Some(mut payload) = self.payload.take() {
            self.entry.ops().destruct(&mut *payload);
            drop(payload);
        }
    }
}

/// A shared, immutable value of a runtime-assigned type.
///
/// Cloning a value is cheap and yields another handle to the same
/// payload; the payload is destroyed when the last handle goes away.
///
/// The special null value represents "no value" and is what failed
/// conversions and unresolved lookups produce.
#[derive(Clone)]
pub struct Value(Arc<Cell>);

impl Value {
    pub(crate) fn from_parts(entry: Arc<TypeEntry>, payload: Box<dyn Any + Send + Sync>) -> Self {
        Self(Arc::new(Cell {
            entry,
            payload: Some(payload),
        }))
    }

    /// Gets the shared null value.
    pub fn null() -> Self {
        static NULL: OnceLock<Value> = OnceLock::new();
        NULL.get_or_init(|| Value::from_parts(TypeEntry::null().clone(), Box::new(())))
            .clone()
    }

    /// Whether this is the null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.is::<()>()
    }

    /// Whether the payload of this value is of native type `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.0.entry.native() == TypeId::of::<T>()
    }

    /// Gets a reference to the payload if it is of native type `T`.
    #[inline]
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.payload.as_deref()?.downcast_ref::<T>()
    }

    /// Gets the descriptor entry of this value's type.
    #[inline]
    pub fn entry(&self) -> &TypeEntry {
        &self.0.entry
    }

    /// Gets the registry lookup index of this value's type.
    #[inline]
    pub fn type_index(&self) -> TypeIndex {
        self.0.entry.index()
    }

    /// Gets the name of this value's type.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.0.entry.name()
    }

    /// Gets the persisted tag of this value's type.
    #[inline]
    pub fn type_tag(&self) -> u32 {
        self.0.entry.tag()
    }

    /// Attempts to represent this value as native type `T`.
    ///
    /// A value that already is a `T` is returned as-is. Otherwise
    /// this value's type is asked to convert to `T`, and failing
    /// that, `T`'s type is asked to convert from this value.
    ///
    /// [`None`] means that the value is not representable as `T`.
    pub fn try_convert<T: Any>(&self, registry: &TypeRegistry) -> Option<Value> {
        if self.is::<T>() {
            return Some(self.clone());
        }

        let target = registry.entry_of::<T>()?;
        self.0
            .entry
            .ops()
            .convert_to(self, target.native(), registry)
            .or_else(|| target.ops().convert_from(self, registry))
    }

    /// Like [`Value::try_convert`], but reports an unrepresentable
    /// value as an error.
    pub fn convert<T: Any>(&self, registry: &TypeRegistry) -> Result<Value, Error> {
        self.try_convert::<T>(registry)
            .ok_or_else(|| Error::NotConvertible {
                from: self.type_name(),
                to: registry
                    .entry_of::<T>()
                    .map(|e| e.name())
                    .unwrap_or(std::any::type_name::<T>()),
            })
    }

    /// Gets the named child of a containing value.
    #[inline]
    pub fn child(&self, name: &str) -> Option<Value> {
        self.0.entry.ops().child(self, name)
    }

    /// Gets the names of all named children of a containing value.
    #[inline]
    pub fn child_names(&self) -> Vec<Arc<str>> {
        self.0.entry.ops().child_names(self)
    }

    /// Gets the child at `index` of a containing value.
    #[inline]
    pub fn child_at(&self, index: usize) -> Option<Value> {
        self.0.entry.ops().child_at(self, index)
    }

    /// Gets the number of children of a containing value.
    #[inline]
    pub fn child_count(&self) -> usize {
        self.0.entry.ops().child_count(self)
    }

    /// Whether `a` and `b` are handles to the same payload.
    #[inline]
    pub fn ptr_eq(a: &Value, b: &Value) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Gets the number of live handles to this payload.
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.0.entry.native() != other.0.entry.native() {
            return false;
        }

        Value::ptr_eq(self, other) || self.0.entry.ops().eq(self, other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.entry.ops().fmt(self, f)
    }
}
