use std::{any::Any, collections::HashMap, fmt, path::Path, sync::Arc};

use hoard_value::{Dict, TypeRegistry, TypedValue, Value};

/// A domain object produced from a resource dict by a [`ResourceFactory`].
pub trait ResourceObject: Any + Send + Sync + fmt::Debug {
    /// Gets the object for downcasting to its concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Called once when the load producing this object is finalized.
    ///
    /// Returning `false` vetoes the object and its resource reports
    /// the null value instead.
    fn load_complete(&self, _from_source: bool) -> bool {
        true
    }

    /// Writes the fields [`ResourceFactory::load_from_cache`] needs to
    /// rebuild this object into `dict`.
    ///
    /// Returns `false` when the object has no cache form.
    fn save_to_cache(&self, _dict: &mut Dict, _registry: &TypeRegistry) -> bool {
        false
    }
}

/// The value payload holding a [`ResourceObject`].
#[derive(Clone)]
pub struct ObjectValue(pub Arc<dyn ResourceObject>);

impl ObjectValue {
    /// Gets the object as concrete type `T`.
    pub fn downcast_ref<T: ResourceObject>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl TypedValue for ObjectValue {
    const NAME: &'static str = "resource_object";

    fn value_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// State shared with factories while building from sources.
pub struct LoadContext<'a> {
    registry: &'a TypeRegistry,
    base_path: &'a Path,
    debug: bool,
    errors: Vec<String>,
}

impl<'a> LoadContext<'a> {
    pub fn new(registry: &'a TypeRegistry, base_path: &'a Path, debug: bool) -> Self {
        Self {
            registry,
            base_path,
            debug,
            errors: Vec::new(),
        }
    }

    #[inline]
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// The directory that relative paths in sources are based on.
    #[inline]
    pub fn base_path(&self) -> &'a Path {
        self.base_path
    }

    #[inline]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Records a build error; the build fails once it is finished.
    pub fn add_error(&mut self, error: impl Into<String>) {
        let error = error.into();
        log::error!("{error}");
        self.errors.push(error);
    }

    #[inline]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub(crate) fn into_errors(self) -> Vec<String> {
        self.errors
    }
}

/// Builds [`ResourceObject`]s from dicts tagged with a type name.
pub trait ResourceFactory: Send + Sync {
    /// Builds an object from a source dict.
    fn load_from_source(
        &self,
        dict: &Dict,
        context: &mut LoadContext<'_>,
    ) -> Option<Arc<dyn ResourceObject>>;

    /// Builds an object from a dict written by
    /// [`ResourceObject::save_to_cache`], or from the source dict
    /// itself when the object has no cache form.
    fn load_from_cache(&self, dict: &Dict, registry: &TypeRegistry) -> Option<Arc<dyn ResourceObject>>;
}

/// The factories for all known resource type names.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, Box<dyn ResourceFactory>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the factory for resource dicts tagged `name`,
    /// replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: ResourceFactory + 'static,
    {
        let name = name.into();
        log::debug!("Registered resource factory '{name}'");
        self.factories.insert(name, Box::new(factory));
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&dyn ResourceFactory> {
        self.factories.get(name).map(|f| &**f)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Resolves `loc:` strings into localized values.
pub trait Localizer: Send + Sync {
    fn localize(&self, name: &str) -> Option<Value>;
}

impl<F> Localizer for F
where
    F: Fn(&str) -> Option<Value> + Send + Sync,
{
    fn localize(&self, name: &str) -> Option<Value> {
        self(name)
    }
}
