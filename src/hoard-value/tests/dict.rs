use std::io::Write;

use hoard_stream::{Data, FileReader, SavedData, SavedDataType};
use hoard_value::{Dict, Error, TypeRegistry, Value};
use tempfile::NamedTempFile;

fn sample(registry: &TypeRegistry) -> Dict {
    let mut inner = Dict::new();
    inner.set("flag", registry.create(true));
    inner.set("ratio", registry.create(0.25f64));

    let mut dict = Dict::new();
    dict.set("name", registry.create(String::from("crate")));
    dict.set("count", registry.create(12i32));
    dict.set("tags", registry.create(vec![String::from("a"), String::from("b")]));
    dict.set(
        "mixed",
        registry.create(vec![Value::null(), registry.create(-1i32)]),
    );
    dict.set("inner", registry.create(inner));
    dict.set("blob", registry.create(Data::new(vec![0, 1, 2, 3])));

    dict
}

#[test]
fn typed_round_trip() -> Result<(), Error> {
    let registry = TypeRegistry::new();
    let value = registry.create(sample(&registry));

    // Dicts come back as saved data and decode on conversion.
    let loaded = registry.load_data(registry.save_data(&value)?)?;
    assert!(loaded.get::<SavedData>().is_some());
    let dict = loaded.try_convert::<Dict>(&registry).unwrap();
    let expanded = dict.get::<Dict>().unwrap().expanded(&registry)?;
    assert_eq!(registry.create(expanded), value);

    let inner = dict.child("inner").unwrap();
    assert!(inner.get::<SavedData>().is_some());
    assert_eq!(
        inner.try_convert::<Dict>(&registry).and_then(|v| v.child("ratio")),
        Some(registry.create(0.25f64))
    );

    Ok(())
}

#[test]
fn nested_dicts_load_lazily() -> Result<(), Error> {
    let registry = TypeRegistry::new();
    let original = sample(&registry);

    let mut temp = NamedTempFile::new()?;
    temp.write_all(&registry.save_data(&registry.create(original.clone()))?)?;
    temp.flush()?;

    let mut reader = FileReader::open_heap(temp.path())?;
    let loaded = registry.load_typed(&mut reader)?;

    let saved = loaded.get::<SavedData>().unwrap();
    assert!(saved.kind().contains(SavedDataType::DICT));
    assert!(saved.is_file_backed());

    let outer = Dict::from_saved(saved, &registry)?;
    let inner = outer.get("inner").unwrap();
    let inner_saved = inner.get::<SavedData>().unwrap();
    assert!(inner_saved.kind().contains(SavedDataType::DICT));
    assert_eq!(
        Dict::from_saved(inner_saved, &registry)?,
        *original.get("inner").unwrap().get::<Dict>().unwrap()
    );

    assert_eq!(outer.get("name"), original.get("name"));
    assert_eq!(outer.expanded(&registry)?, original);
    Ok(())
}

#[test]
fn large_dicts_are_compressed() -> Result<(), Error> {
    let registry = TypeRegistry::new();

    let mut dict = Dict::new();
    for i in 0..64 {
        dict.set(format!("entry_{i}"), registry.create(format!("value number {i}")));
    }

    let saved = dict.to_saved(&registry)?;
    assert!(saved.kind().contains(SavedDataType::ZLIB_COMPRESSED | SavedDataType::DICT));
    assert!(saved.saved_size() < saved.loaded_size());
    assert_eq!(Dict::from_saved(&saved, &registry)?, dict);

    let small = sample(&registry).get("inner").unwrap().get::<Dict>().unwrap().to_saved(&registry)?;
    assert!(!small.kind().contains(SavedDataType::ZLIB_COMPRESSED));

    Ok(())
}

#[test]
fn equality_ignores_order() {
    let registry = TypeRegistry::new();

    let mut a = Dict::new();
    a.set("x", registry.create(1i32));
    a.set("y", registry.create(2i32));

    let mut b = Dict::new();
    b.set("y", registry.create(2i32));
    b.set("x", registry.create(1i32));

    assert_eq!(a, b);

    b.set("x", registry.create(3i32));
    assert_ne!(a, b);
}

#[test]
fn accessors() {
    let registry = TypeRegistry::new();
    let mut dict = sample(&registry);

    assert_eq!(
        dict.get_as::<f64>("count", &registry),
        Some(registry.create(12.0f64))
    );
    assert!(dict.get_as::<i32>("missing", &registry).is_none());

    assert!(!dict.try_set("count", registry.create(0i32)));
    assert!(dict.remove("blob").is_some());
    assert_eq!(
        dict.child_names().iter().map(|n| &**n).collect::<Vec<_>>(),
        ["name", "count", "tags", "mixed", "inner"]
    );

    let mut other = Dict::new();
    other.set("count", registry.create(13i32));
    other.set("extra", Value::null());
    dict.merge(other);

    assert_eq!(dict.len(), 6);
    assert_eq!(dict.get("count"), Some(&registry.create(13i32)));
}

#[test]
fn dict_as_saved_data() -> Result<(), Error> {
    let registry = TypeRegistry::new();
    let value = registry.create(sample(&registry));

    let saved = value.try_convert::<SavedData>(&registry).unwrap();
    assert!(saved
        .get::<SavedData>()
        .unwrap()
        .kind()
        .contains(SavedDataType::DICT));

    let back = saved.try_convert::<Dict>(&registry).unwrap();
    assert_eq!(back.get::<Dict>().unwrap().expanded(&registry)?, *value.get::<Dict>().unwrap());

    // Plain saved data is not a dict.
    let plain = registry.create(SavedData::from_data(Data::new(vec![0; 8]), 8, SavedDataType::NONE));
    assert!(plain.try_convert::<Dict>(&registry).is_none());

    Ok(())
}

#[test]
fn saved_children_stay_lazy() -> Result<(), Error> {
    let registry = TypeRegistry::new();

    let payload = vec![0xAB; 4096];
    let mut dict = Dict::new();
    dict.set(
        "payload",
        registry.create(SavedData::from_data(Data::new(payload.clone()), 4096, SavedDataType::NONE)),
    );

    let mut temp = NamedTempFile::new()?;
    temp.write_all(&registry.save_data(&registry.create(dict))?)?;
    temp.flush()?;

    let mut reader = FileReader::open_heap(temp.path())?;
    let loaded = registry.load_typed(&mut reader)?;

    let child = loaded.child("payload").unwrap();
    let saved = child.get::<SavedData>().unwrap();
    assert!(saved.is_file_backed());
    assert_eq!(&*saved.loaded_data()?, &payload[..]);

    Ok(())
}
