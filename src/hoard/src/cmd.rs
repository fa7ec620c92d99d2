use std::{path::Path, sync::Arc};

use eyre::Context;
use hoard_executor::Executor;
use hoard_resource::{
    CacheBuilder, CacheFactory, FactoryRegistry, ResourceCache, RESOURCE_CACHE_TYPE,
};
use hoard_stream::FileReader;
use hoard_value::TypeRegistry;

pub mod list;
pub mod pack;
pub mod show;

/// A command the CLI can run.
pub trait Command {
    fn handle(self) -> eyre::Result<()>;
}

/// Gets the factories for all resource types the CLI understands.
pub fn factories(registry: &Arc<TypeRegistry>) -> Arc<FactoryRegistry> {
    let mut factories = FactoryRegistry::new();
    factories.register(RESOURCE_CACHE_TYPE, CacheFactory::new(registry.clone()));
    Arc::new(factories)
}

/// Opens the resource pack at `path` into a fresh cache.
pub fn open_pack(path: &Path, executor: Arc<Executor>) -> eyre::Result<ResourceCache> {
    let registry = Arc::new(hoard_resource::registry());
    let cache = CacheBuilder::new(registry.clone())
        .factories(factories(&registry))
        .executor(executor)
        .build();

    let mut reader = FileReader::open_mmap(path)
        .with_context(|| format!("failed to open pack at '{}'", path.display()))?;
    let count = cache
        .add_resources_from(&mut reader)
        .with_context(|| format!("failed to read pack at '{}'", path.display()))?;

    log::debug!("Opened {count} resources from '{}'", path.display());
    Ok(cache)
}
