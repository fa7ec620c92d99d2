use hoard_stream::{Data, SavedData, SavedDataType};
use hoard_value::{Dict, Error, TypeRegistry, Value};

#[test]
fn equality_checks_type_first() {
    let registry = TypeRegistry::new();

    let one = registry.create(1i32);
    let one_f = registry.create(1.0f64);

    assert_eq!(one, registry.create(1i32));
    assert_ne!(one, one_f);
    assert_ne!(one, Value::null());
    assert_eq!(Value::null(), registry.load_data(registry.save_data(&Value::null()).unwrap()).unwrap());
}

#[test]
fn convert_same_type_is_identity() {
    let registry = TypeRegistry::new();
    let value = registry.create(String::from("abc"));

    let converted = value.try_convert::<String>(&registry).unwrap();
    assert!(Value::ptr_eq(&value, &converted));
}

#[test]
fn scalar_conversions() {
    let registry = TypeRegistry::new();

    let text = registry.create(String::from(" 42 "));
    let int = text.try_convert::<i32>(&registry).unwrap();
    assert_eq!(int.get::<i32>(), Some(&42));

    let float = int.try_convert::<f64>(&registry).unwrap();
    assert_eq!(float.get::<f64>(), Some(&42.0));

    let back = float.try_convert::<String>(&registry).unwrap();
    assert_eq!(back.get::<String>().map(String::as_str), Some("42"));

    let flag = int.try_convert::<bool>(&registry).unwrap();
    assert_eq!(flag.get::<bool>(), Some(&true));
}

#[test]
fn unrepresentable_is_none() {
    let registry = TypeRegistry::new();

    let text = registry.create(String::from("not a number"));
    assert!(text.try_convert::<i32>(&registry).is_none());

    let fraction = registry.create(1.5f64);
    assert!(fraction.try_convert::<i32>(&registry).is_none());

    assert!(matches!(
        fraction.convert::<Dict>(&registry),
        Err(Error::NotConvertible {
            from: "float64",
            to: "dict"
        })
    ));
}

#[test]
fn lists_convert_to_value_lists() {
    let registry = TypeRegistry::new();

    let ints = registry.create(vec![1i32, 2, 3]);
    let values = ints.try_convert::<Vec<Value>>(&registry).unwrap();

    assert_eq!(values.child_count(), 3);
    assert_eq!(values.child_at(2), Some(registry.create(3i32)));
}

#[test]
fn data_and_saved_data() {
    let registry = TypeRegistry::new();

    let data = registry.create(Data::new(b"payload".to_vec()));
    let saved = data.try_convert::<SavedData>(&registry).unwrap();
    assert_eq!(saved.get::<SavedData>().unwrap().kind(), SavedDataType::NONE);

    let compressed = registry.create(SavedData::compress(&[9; 500], SavedDataType::NONE).unwrap());
    let inflated = compressed.try_convert::<Data>(&registry).unwrap();
    assert_eq!(&**inflated.get::<Data>().unwrap(), &[9; 500][..]);
}

#[test]
fn debug_prints_tree() {
    let registry = TypeRegistry::new();

    let mut dict = Dict::new();
    dict.set("name", registry.create(String::from("hoard")));
    dict.set("sizes", registry.create(vec![1i32, 2]));

    let value = registry.create(dict);
    assert_eq!(format!("{value:?}"), r#"{"name": "hoard", "sizes": [1, 2]}"#);
}
