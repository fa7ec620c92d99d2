use std::{
    alloc::Layout,
    any::TypeId,
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

use hoard_stream::{Data, DataReader, DataWriter, Reader, Writer};
use hoard_utils::{binary, hash::djb2};
use hoard_value::{
    Error, NativeType, RegistryError, TypeIndex, TypeRegistry, TypedValue, Value, ValueType,
    MAX_TYPES,
};

#[derive(Debug, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

impl TypedValue for Point {
    const NAME: &'static str = "point";

    fn value_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }

    fn load(reader: &mut dyn Reader, _registry: &TypeRegistry) -> Result<Self, Error> {
        Ok(Self {
            x: binary::int32(reader)?,
            y: binary::int32(reader)?,
        })
    }

    fn save(&self, writer: &mut dyn Writer, _registry: &TypeRegistry) -> Result<(), Error> {
        binary::write_int32(writer, self.x)?;
        binary::write_int32(writer, self.y)?;
        Ok(())
    }
}

/// Same name as `Point`, different native type.
struct Impostor;

impl TypedValue for Impostor {
    const NAME: &'static str = "point";

    fn value_eq(&self, _other: &Self) -> bool {
        true
    }
}

struct AlsoPoint;

impl TypedValue for AlsoPoint {
    const NAME: &'static str = "also_point";

    fn value_eq(&self, _other: &Self) -> bool {
        true
    }
}

/// A descriptor with a generated name and native type.
struct Generated {
    name: &'static str,
    native: TypeId,
}

impl ValueType for Generated {
    fn name(&self) -> &'static str {
        self.name
    }

    fn native(&self) -> TypeId {
        self.native
    }

    fn layout(&self) -> Layout {
        Layout::new::<()>()
    }

    fn eq(&self, _a: &Value, _b: &Value) -> bool {
        true
    }

    fn fmt(&self, _value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }

    fn load(&self, _reader: &mut dyn Reader, _registry: &TypeRegistry) -> Result<Value, Error> {
        Err(Error::NotPersistable(self.name))
    }

    fn save(&self, _value: &Value, _writer: &mut dyn Writer, _registry: &TypeRegistry) -> Result<(), Error> {
        Err(Error::NotPersistable(self.name))
    }
}

#[allow(dead_code)]
struct Zero;
#[allow(dead_code)]
struct One;

// Expands to one distinct tuple type per combination of bits.
macro_rules! type_ids {
    ($out:ident, $t:ty;) => {
        $out.push(TypeId::of::<$t>());
    };
    ($out:ident, $t:ty; $bit:tt $($rest:tt)*) => {
        type_ids!($out, ($t, Zero); $($rest)*);
        type_ids!($out, ($t, One); $($rest)*);
    };
}

fn generated_types() -> Vec<Box<dyn ValueType>> {
    let mut natives = Vec::with_capacity(256);
    type_ids!(natives, (); b b b b b b b b);

    natives
        .into_iter()
        .enumerate()
        .map(|(i, native)| {
            let name: &'static str = Box::leak(format!("generated_{i}").into_boxed_str());
            Box::new(Generated { name, native }) as Box<dyn ValueType>
        })
        .collect()
}

static DESTRUCTED: AtomicUsize = AtomicUsize::new(0);

struct Tracked;

impl TypedValue for Tracked {
    const NAME: &'static str = "tracked";

    fn value_eq(&self, _other: &Self) -> bool {
        true
    }

    fn destruct(&mut self) {
        DESTRUCTED.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn builtins_are_registered() {
    let registry = TypeRegistry::new();

    for name in [
        "null",
        "bool",
        "int32",
        "float64",
        "string",
        "int32_list",
        "string_list",
        "value_list",
        "dict",
        "data",
        "saved_data",
    ] {
        let entry = registry.by_name(name).unwrap();
        assert_eq!(entry.tag(), djb2(name.as_bytes()));
    }

    assert_eq!(registry.entry_of::<()>().unwrap().index(), TypeIndex::NULL);
    assert_eq!(registry.len(), 11);
}

#[test]
fn indices_are_dense() {
    let mut registry = TypeRegistry::new();
    let before = registry.len();

    let index = registry.register::<Point>();
    assert_eq!(index.get(), before);
    assert_eq!(registry.by_index(index).unwrap().name(), "point");
}

#[test]
fn duplicate_tag() {
    let mut registry = TypeRegistry::new();
    registry.register::<Point>();

    assert!(matches!(
        registry.try_register::<Impostor>(),
        Err(RegistryError::DuplicateTag { name: "point", .. })
    ));
}

#[test]
fn duplicate_native() {
    let mut registry = TypeRegistry::new();
    registry.register::<AlsoPoint>();

    assert!(matches!(
        registry.try_register::<AlsoPoint>(),
        Err(RegistryError::DuplicateNative { .. })
    ));
}

#[test]
#[should_panic(expected = "failed to register type")]
fn register_panics_on_collision() {
    let mut registry = TypeRegistry::new();
    registry.register::<i32>();
}

#[test]
fn registry_is_bounded() {
    let mut registry = TypeRegistry::empty();
    let mut types = generated_types().into_iter();

    while registry.len() < MAX_TYPES {
        registry.register_type(types.next().unwrap());
    }
    assert_eq!(registry.len(), 256);

    assert!(matches!(
        registry.try_register_type(types.next().unwrap()),
        Err(RegistryError::Exhausted)
    ));
    assert_eq!(registry.len(), MAX_TYPES);
    assert!(registry.by_name("generated_254").is_some());
}

#[test]
#[should_panic(expected = "failed to register type")]
fn register_type_panics_on_duplicate_tag() {
    let mut registry = TypeRegistry::new();
    registry.register_type(NativeType::<Point>::boxed());
    registry.register_type(NativeType::<Impostor>::boxed());
}

#[test]
#[should_panic(expected = "is not registered")]
fn create_unregistered() {
    let registry = TypeRegistry::new();
    registry.create(Point { x: 1, y: 2 });
}

#[test]
fn custom_type_round_trip() -> Result<(), Error> {
    let mut registry = TypeRegistry::new();
    registry.register::<Point>();

    let value = registry.create(Point { x: -3, y: 7 });
    let data = registry.save_data(&value)?;

    let loaded = registry.load_data(data)?;
    assert_eq!(loaded.get::<Point>(), Some(&Point { x: -3, y: 7 }));
    assert_eq!(loaded, value);
    assert_eq!(format!("{loaded:?}"), "(-3, 7)");

    Ok(())
}

#[test]
fn unknown_tag_is_reported() -> Result<(), Error> {
    let mut registry = TypeRegistry::new();
    registry.register::<Point>();

    let data = registry.save_data(&registry.create(Point { x: 0, y: 0 }))?;

    // A build without the type cannot load it.
    let other = TypeRegistry::new();
    let err = other.load_data(data).unwrap_err();
    assert!(matches!(err, Error::UnknownType(tag) if tag == djb2(b"point")));

    Ok(())
}

#[test]
fn truncated_value() {
    let registry = TypeRegistry::new();

    let mut writer = DataWriter::new();
    registry
        .save_typed(&registry.create(String::from("truncated")), &mut writer)
        .unwrap();
    let mut bytes = writer.into_inner();
    bytes.truncate(bytes.len() - 2);

    let mut reader = DataReader::new(Data::new(bytes));
    assert!(matches!(registry.load_typed(&mut reader), Err(Error::Io(_))));
}

#[test]
fn not_persistable() {
    let mut registry = TypeRegistry::new();
    registry.register::<AlsoPoint>();

    let value = registry.create(AlsoPoint);
    assert!(matches!(
        registry.save_data(&value),
        Err(Error::NotPersistable("also_point"))
    ));
}

#[test]
fn destruct_runs_once() {
    let mut registry = TypeRegistry::new();
    registry.register::<Tracked>();

    let value = registry.create(Tracked);
    let other = value.clone();
    assert_eq!(value.ref_count(), 2);

    drop(value);
    assert_eq!(DESTRUCTED.load(Ordering::SeqCst), 0);

    drop(other);
    assert_eq!(DESTRUCTED.load(Ordering::SeqCst), 1);
}

#[test]
fn null_is_shared() {
    let a = Value::null();
    let b = Value::default();

    assert!(a.is_null());
    assert!(Value::ptr_eq(&a, &b));
    assert_eq!(a.type_index(), TypeIndex::NULL);
    assert_eq!(a.type_name(), "null");
}
