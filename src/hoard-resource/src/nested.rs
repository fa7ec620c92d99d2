use std::{any::Any, sync::Arc};

use hoard_executor::Executor;
use hoard_value::{Dict, TypeRegistry};

use crate::{
    CacheBuilder, CacheError, FactoryRegistry, LoadContext, ResourceCache, ResourceFactory,
    ResourceObject,
};

/// The `res:type` of dicts which hold a nested [`ResourceCache`].
pub const RESOURCE_CACHE_TYPE: &str = "resource_cache";

impl ResourceObject for ResourceCache {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn save_to_cache(&self, dict: &mut Dict, _registry: &TypeRegistry) -> bool {
        match ResourceCache::save_to_cache(self, dict) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to persist nested cache: {e}");
                false
            }
        }
    }
}

/// Builds nested [`ResourceCache`]s, usually registered under
/// [`RESOURCE_CACHE_TYPE`].
///
/// From sources, every child of the dict which is not metadata becomes
/// a resource of the nested cache. Nested caches load on the calling
/// thread unless configured otherwise.
pub struct CacheFactory {
    registry: Arc<TypeRegistry>,
    factories: Arc<FactoryRegistry>,
    executor: Arc<Executor>,
}

impl CacheFactory {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            factories: Arc::new(FactoryRegistry::new()),
            executor: Arc::new(Executor::current()),
        }
    }

    /// Sets the factories of the nested caches.
    pub fn factories(mut self, factories: impl Into<Arc<FactoryRegistry>>) -> Self {
        self.factories = factories.into();
        self
    }

    pub fn executor(mut self, executor: Arc<Executor>) -> Self {
        self.executor = executor;
        self
    }

    fn cache(&self) -> ResourceCache {
        CacheBuilder::new(self.registry.clone())
            .factories(self.factories.clone())
            .executor(self.executor.clone())
            .build()
    }
}

impl ResourceFactory for CacheFactory {
    fn load_from_source(
        &self,
        dict: &Dict,
        _context: &mut LoadContext<'_>,
    ) -> Option<Arc<dyn ResourceObject>> {
        let cache = self.cache();
        let added = cache.add_resources(dict);
        log::debug!("Built nested cache of {added} resources");

        Some(Arc::new(cache))
    }

    fn load_from_cache(&self, dict: &Dict, _registry: &TypeRegistry) -> Option<Arc<dyn ResourceObject>> {
        let cache = self.cache();
        match cache.add_resources_from_cache(dict) {
            Ok(_) => {}
            Err(CacheError::MissingResources) => {
                cache.add_resources(dict);
            }
            Err(e) => {
                log::error!("Failed to load nested cache: {e}");
                return None;
            }
        }

        Some(Arc::new(cache))
    }
}
