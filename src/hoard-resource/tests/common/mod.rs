#![allow(dead_code)]

use std::{
    any::Any,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use hoard_executor::Executor;
use hoard_resource::{
    CacheBuilder, FactoryRegistry, LoadContext, ResourceCache, ResourceFactory, ResourceObject,
    RES_TYPE,
};
use hoard_value::{Dict, TypeRegistry, Value};

/// Finished tracers, in the order their loads completed.
pub type Log = Arc<Mutex<Vec<String>>>;

#[derive(Debug)]
pub struct Tracer {
    pub name: String,
    pub next: Value,
    accept: bool,
    log: Log,
}

impl ResourceObject for Tracer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn load_complete(&self, _from_source: bool) -> bool {
        self.log.lock().unwrap().push(self.name.clone());
        self.accept
    }

    fn save_to_cache(&self, dict: &mut Dict, registry: &TypeRegistry) -> bool {
        dict.set("name", registry.create(self.name.clone()));
        true
    }
}

#[derive(Clone, Default)]
pub struct TracerFactory {
    pub built: Arc<AtomicUsize>,
    pub log: Log,
}

impl TracerFactory {
    pub fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn build(&self, dict: &Dict) -> Option<Arc<dyn ResourceObject>> {
        let name = dict.get("name")?.get::<String>()?.clone();
        let accept = dict
            .get("accept")
            .and_then(|v| v.get::<bool>())
            .copied()
            .unwrap_or(true);

        Some(Arc::new(Tracer {
            name,
            next: dict.get("next").cloned().unwrap_or_default(),
            accept,
            log: self.log.clone(),
        }))
    }
}

impl ResourceFactory for TracerFactory {
    fn load_from_source(
        &self,
        dict: &Dict,
        _context: &mut LoadContext<'_>,
    ) -> Option<Arc<dyn ResourceObject>> {
        self.build(dict)
    }

    fn load_from_cache(&self, dict: &Dict, _registry: &TypeRegistry) -> Option<Arc<dyn ResourceObject>> {
        self.built.fetch_add(1, Ordering::SeqCst);
        self.build(dict)
    }
}

pub fn registry() -> Arc<TypeRegistry> {
    Arc::new(hoard_resource::registry())
}

pub fn string(registry: &TypeRegistry, s: &str) -> Value {
    registry.create(s.to_string())
}

/// A tracer dict named `name`, optionally referencing `next`.
pub fn tracer(registry: &TypeRegistry, name: &str, next: Option<&str>) -> Value {
    let mut dict = Dict::new();
    dict.set(RES_TYPE, string(registry, "tracer"));
    dict.set("name", string(registry, name));
    if let Some(next) = next {
        dict.set("next", string(registry, &format!("ref:{next}")));
    }
    registry.create(dict)
}

pub fn cache_with(registry: &Arc<TypeRegistry>, factory: &TracerFactory, executor: Executor) -> ResourceCache {
    let mut factories = FactoryRegistry::new();
    factories.register("tracer", factory.clone());

    CacheBuilder::new(registry.clone())
        .factories(factories)
        .executor(Arc::new(executor))
        .build()
}

pub fn executors() -> [Executor; 2] {
    [Executor::current(), Executor::threaded(4)]
}
