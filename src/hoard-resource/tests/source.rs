use std::path::Path;

use hoard_resource::{
    load_resources_from_json, FactoryRegistry, ObjectValue, SourceError, RES_TYPE,
};
use hoard_value::{Dict, Value};

mod common;
use common::{registry, string, TracerFactory};

fn factories() -> FactoryRegistry {
    let mut factories = FactoryRegistry::new();
    factories.register("tracer", TracerFactory::default());
    factories
}

#[test]
fn json_values() {
    let registry = registry();
    let json = serde_json::json!({
        "res:meta": "dropped",
        "flag": true,
        "small": 7,
        "large": 1u64 << 40,
        "ratio": 0.5,
        "nothing": null,
        "words": ["a", "b"],
        "nested": { "res:kept": 1, "inner": "x" },
    });

    let dict =
        load_resources_from_json(&json, Path::new(""), &registry, &FactoryRegistry::new(), false)
            .unwrap();

    assert!(dict.get("res:meta").is_none());
    assert_eq!(dict.get("flag"), Some(&registry.create(true)));
    assert_eq!(dict.get("small"), Some(&registry.create(7)));
    assert_eq!(dict.get("large"), Some(&registry.create((1u64 << 40) as f64)));
    assert_eq!(dict.get("ratio"), Some(&registry.create(0.5)));
    assert!(dict.get("nothing").unwrap().is_null());

    let words = dict.get("words").unwrap();
    assert_eq!(words.child_count(), 2);
    assert_eq!(words.child_at(1), Some(string(&registry, "b")));

    let nested = dict.get("nested").unwrap().get::<Dict>().unwrap();
    assert_eq!(nested.get("res:kept"), Some(&registry.create(1)));
}

#[test]
fn factories_produce_cache_forms() {
    let registry = registry();
    let json = serde_json::json!({
        "door": { "res:type": "tracer", "name": "door", "colour": "red" },
        "odd": { "res:type": "unknown", "shape": "round" },
    });

    let dict =
        load_resources_from_json(&json, Path::new(""), &registry, &factories(), false).unwrap();

    let door = dict.get("door").unwrap().get::<Dict>().unwrap();
    assert_eq!(door.get(RES_TYPE), Some(&string(&registry, "tracer")));
    assert_eq!(door.get("name"), Some(&string(&registry, "door")));
    assert!(door.get("colour").is_none());

    let odd = dict.get("odd").unwrap().get::<Dict>().unwrap();
    assert_eq!(odd.get("shape"), Some(&string(&registry, "round")));
}

#[test]
fn factory_failures_fail_the_build() {
    let registry = registry();
    let json = serde_json::json!({
        "broken": { "res:type": "tracer" },
    });

    let err = load_resources_from_json(&json, Path::new(""), &registry, &factories(), false)
        .unwrap_err();
    match err {
        SourceError::Build(errors) => assert_eq!(errors.len(), 1),
        e => panic!("unexpected error: {e}"),
    }

    let err = load_resources_from_json(
        &serde_json::json!([1, 2]),
        Path::new(""),
        &registry,
        &factories(),
        false,
    )
    .unwrap_err();
    assert!(matches!(err, SourceError::Build(_)));
}

#[test]
fn built_objects_load_from_cache() {
    let registry = registry();
    let factory = TracerFactory::default();
    let mut factories = FactoryRegistry::new();
    factories.register("tracer", factory.clone());

    let json = serde_json::json!({
        "door": { "res:type": "tracer", "name": "door" },
    });
    let dict = load_resources_from_json(&json, Path::new(""), &registry, &factories, false).unwrap();

    let cache = hoard_resource::CacheBuilder::new(registry.clone())
        .factories(factories)
        .build();
    cache.add_resources(&dict);

    let door = cache.get_resource_object("door");
    cache.flush_all_resources();

    let value: Value = door.value();
    let object = value.get::<ObjectValue>().unwrap();
    assert_eq!(object.downcast_ref::<common::Tracer>().unwrap().name, "door");
    assert_eq!(factory.built(), 1);
}
