use std::{fs, io, path::Path};

use hoard_value::{Dict, TypeRegistry, Value};
use serde_json::Value as Json;
use thiserror::Error;

use crate::{FactoryRegistry, LoadContext, RES_PREFIX, RES_SOURCE, RES_TYPE};

/// Errors that may occur when building resources from sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Json(serde_json::Error),

    #[error("{0}")]
    Value(#[from] hoard_value::Error),

    /// Factories reported errors while building objects.
    #[error("{}", .0.join("; "))]
    Build(Vec<String>),
}

impl From<serde_json::Error> for SourceError {
    fn from(value: serde_json::Error) -> Self {
        use serde_json::error::Category;

        match value.classify() {
            Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

/// Turns a source file into the resource dict shape used by the cache.
pub trait SourceParser: Send + Sync {
    fn parse(
        &self,
        path: &Path,
        registry: &TypeRegistry,
        factories: &FactoryRegistry,
        debug: bool,
    ) -> Result<Dict, SourceError>;
}

/// The [`SourceParser`] for JSON resource sources.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSourceParser;

impl SourceParser for JsonSourceParser {
    fn parse(
        &self,
        path: &Path,
        registry: &TypeRegistry,
        factories: &FactoryRegistry,
        debug: bool,
    ) -> Result<Dict, SourceError> {
        load_resources_from_file(path, registry, factories, debug)
    }
}

/// Builds the resources of the JSON file at `path`.
///
/// With `debug`, the path is recorded as `res:source` so that the
/// cache can rebuild from it later.
pub fn load_resources_from_file(
    path: &Path,
    registry: &TypeRegistry,
    factories: &FactoryRegistry,
    debug: bool,
) -> Result<Dict, SourceError> {
    log::debug!("Building resources from '{}'", path.display());

    let contents = fs::read(path)?;
    let json: Json = serde_json::from_slice(&contents)?;

    let base_path = path.parent().unwrap_or(Path::new(""));
    let mut dict = load_resources_from_json(&json, base_path, registry, factories, debug)?;

    if debug {
        let source = path.to_string_lossy().into_owned();
        dict.set(RES_SOURCE, registry.create(source));
    }

    Ok(dict)
}

/// Builds resources from a JSON document.
///
/// Objects tagged with a `res:type` known to `factories` are handed to
/// [`ResourceFactory::load_from_source`](crate::ResourceFactory::load_from_source)
/// and replaced with their cache form. `res:`-prefixed names at the top
/// level are dropped.
pub fn load_resources_from_json(
    json: &Json,
    base_path: &Path,
    registry: &TypeRegistry,
    factories: &FactoryRegistry,
    debug: bool,
) -> Result<Dict, SourceError> {
    let Json::Object(root) = json else {
        return Err(SourceError::Build(vec![
            "resource source root must be an object".into(),
        ]));
    };

    let mut context = LoadContext::new(registry, base_path, debug);
    let mut dict = Dict::new();

    for (name, value) in root {
        if name.starts_with(RES_PREFIX) {
            continue;
        }

        let value = build_value(value, &mut context, factories);
        dict.set(name.as_str(), value);
    }

    let errors = context.into_errors();
    if errors.is_empty() {
        Ok(dict)
    } else {
        Err(SourceError::Build(errors))
    }
}

fn build_value(json: &Json, context: &mut LoadContext<'_>, factories: &FactoryRegistry) -> Value {
    let registry = context.registry();

    match json {
        Json::Null => Value::null(),
        Json::Bool(v) => registry.create(*v),
        Json::Number(n) => match n.as_i64().and_then(|v| i32::try_from(v).ok()) {
            Some(v) => registry.create(v),
            None => registry.create(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => registry.create(s.clone()),
        Json::Array(elements) => {
            let list: Vec<Value> = elements
                .iter()
                .map(|e| build_value(e, context, factories))
                .collect();
            registry.create(list)
        }
        Json::Object(children) => {
            let mut dict = Dict::new();
            for (name, child) in children {
                let child = build_value(child, context, factories);
                dict.set(name.as_str(), child);
            }

            build_object(dict, context, factories)
        }
    }
}

fn build_object(dict: Dict, context: &mut LoadContext<'_>, factories: &FactoryRegistry) -> Value {
    let registry = context.registry();

    let Some(ty) = dict.get(RES_TYPE).and_then(|v| v.get::<String>()).cloned() else {
        return registry.create(dict);
    };
    let Some(factory) = factories.get(&ty) else {
        log::warn!("No resource factory for '{ty}', keeping plain dict");
        return registry.create(dict);
    };

    let Some(object) = factory.load_from_source(&dict, context) else {
        context.add_error(format!("Failed to build '{ty}' resource from source"));
        return Value::null();
    };

    let mut cached = Dict::new();
    cached.set(RES_TYPE, registry.create(ty.clone()));
    if object.save_to_cache(&mut cached, registry) {
        registry.create(cached)
    } else {
        log::debug!("'{ty}' object has no cache form, keeping source dict");
        registry.create(dict)
    }
}
