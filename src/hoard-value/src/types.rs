use std::{
    alloc::Layout,
    any::{Any, TypeId},
    fmt,
    marker::PhantomData,
    sync::Arc,
};

use hoard_stream::{Reader, Writer};

use crate::{Error, TypeRegistry, Value};

/// The descriptor of a type that values can hold.
///
/// One descriptor is registered per native type. It carries the
/// operations which generic code dispatches through without knowing
/// the concrete payload type.
///
/// Most types should implement [`TypedValue`] and be registered via
/// [`TypeRegistry::register`] instead of implementing this directly.
pub trait ValueType: Send + Sync + 'static {
    /// The unique name of the type. The persisted tag is derived from it.
    fn name(&self) -> &'static str;

    /// The native Rust type of payloads.
    fn native(&self) -> TypeId;

    /// The size and alignment of payloads.
    fn layout(&self) -> Layout;

    /// Compares two values of this type.
    fn eq(&self, a: &Value, b: &Value) -> bool;

    /// Formats a value of this type for debugging.
    fn fmt(&self, value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    /// Reads a value in this type's persisted format.
    fn load(&self, reader: &mut dyn Reader, registry: &TypeRegistry) -> Result<Value, Error>;

    /// Writes `value` in this type's persisted format.
    fn save(
        &self,
        value: &Value,
        writer: &mut dyn Writer,
        registry: &TypeRegistry,
    ) -> Result<(), Error>;

    /// Gets the value persisted in place of `value`, if its type is
    /// stored as another one.
    fn persisted_as(&self, _value: &Value, _registry: &TypeRegistry) -> Result<Option<Value>, Error> {
        Ok(None)
    }

    /// Converts `value` of this type to the type identified by `target`.
    fn convert_to(&self, _value: &Value, _target: TypeId, _registry: &TypeRegistry) -> Option<Value> {
        None
    }

    /// Converts `value` of another type to this type.
    fn convert_from(&self, _value: &Value, _registry: &TypeRegistry) -> Option<Value> {
        None
    }

    /// Cleans up a payload right before its storage is released.
    fn destruct(&self, _payload: &mut dyn Any) {}

    fn child(&self, _value: &Value, _name: &str) -> Option<Value> {
        None
    }

    fn child_names(&self, _value: &Value) -> Vec<Arc<str>> {
        Vec::new()
    }

    fn child_at(&self, _value: &Value, _index: usize) -> Option<Value> {
        None
    }

    fn child_count(&self, _value: &Value) -> usize {
        0
    }
}

/// A native Rust type which can be the payload of a [`Value`].
///
/// [`NativeType`] turns implementors into a [`ValueType`] descriptor.
pub trait TypedValue: Any + Send + Sync + Sized {
    /// The unique name of the type.
    const NAME: &'static str;

    /// Compares two payloads.
    fn value_eq(&self, other: &Self) -> bool;

    /// Formats the payload for debugging.
    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", Self::NAME)
    }

    /// Reads a payload in its persisted format.
    fn load(_reader: &mut dyn Reader, _registry: &TypeRegistry) -> Result<Self, Error> {
        Err(Error::NotPersistable(Self::NAME))
    }

    /// Writes the payload in its persisted format.
    fn save(&self, _writer: &mut dyn Writer, _registry: &TypeRegistry) -> Result<(), Error> {
        Err(Error::NotPersistable(Self::NAME))
    }

    /// Gets the stand-in persisted in place of the payload.
    fn persisted_as(&self, _registry: &TypeRegistry) -> Result<Option<Value>, Error> {
        Ok(None)
    }

    fn convert_to(&self, _target: TypeId, _registry: &TypeRegistry) -> Option<Value> {
        None
    }

    fn convert_from(_value: &Value, _registry: &TypeRegistry) -> Option<Self> {
        None
    }

    /// Runs cleanup logic before the payload is dropped.
    fn destruct(&mut self) {}

    fn child(&self, _name: &str) -> Option<Value> {
        None
    }

    fn child_names(&self) -> Vec<Arc<str>> {
        Vec::new()
    }

    fn child_at(&self, _index: usize) -> Option<Value> {
        None
    }

    fn child_count(&self) -> usize {
        0
    }
}

/// The [`ValueType`] descriptor for a [`TypedValue`].
pub struct NativeType<T>(PhantomData<fn() -> T>);

impl<T: TypedValue> NativeType<T> {
    /// Creates the descriptor.
    pub fn new() -> Self {
        Self(PhantomData)
    }

    /// Creates the boxed descriptor for registration.
    pub fn boxed() -> Box<dyn ValueType> {
        Box::new(Self::new())
    }
}

impl<T: TypedValue> Default for NativeType<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TypedValue> ValueType for NativeType<T> {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn native(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn layout(&self) -> Layout {
        Layout::new::<T>()
    }

    fn eq(&self, a: &Value, b: &Value) -> bool {
        match (a.get::<T>(), b.get::<T>()) {
            (Some(a), Some(b)) => a.value_eq(b),
            _ => false,
        }
    }

    fn fmt(&self, value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match value.get::<T>() {
            Some(v) => v.fmt_value(f),
            None => write!(f, "<invalid {}>", T::NAME),
        }
    }

    fn load(&self, reader: &mut dyn Reader, registry: &TypeRegistry) -> Result<Value, Error> {
        T::load(reader, registry).map(|v| registry.create(v))
    }

    fn save(
        &self,
        value: &Value,
        writer: &mut dyn Writer,
        registry: &TypeRegistry,
    ) -> Result<(), Error> {
        match value.get::<T>() {
            Some(v) => v.save(writer, registry),
            None => Err(Error::NotPersistable(T::NAME)),
        }
    }

    fn persisted_as(&self, value: &Value, registry: &TypeRegistry) -> Result<Option<Value>, Error> {
        match value.get::<T>() {
            Some(v) => v.persisted_as(registry),
            None => Ok(None),
        }
    }

    fn convert_to(&self, value: &Value, target: TypeId, registry: &TypeRegistry) -> Option<Value> {
        value.get::<T>()?.convert_to(target, registry)
    }

    fn convert_from(&self, value: &Value, registry: &TypeRegistry) -> Option<Value> {
        T::convert_from(value, registry).map(|v| registry.create(v))
    }

    fn destruct(&self, payload: &mut dyn Any) {
        if let Some(v) = payload.downcast_mut::<T>() {
            v.destruct();
        }
    }

    fn child(&self, value: &Value, name: &str) -> Option<Value> {
        value.get::<T>()?.child(name)
    }

    fn child_names(&self, value: &Value) -> Vec<Arc<str>> {
        value.get::<T>().map(T::child_names).unwrap_or_default()
    }

    fn child_at(&self, value: &Value, index: usize) -> Option<Value> {
        value.get::<T>()?.child_at(index)
    }

    fn child_count(&self, value: &Value) -> usize {
        value.get::<T>().map_or(0, T::child_count)
    }
}
