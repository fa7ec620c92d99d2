use std::{
    collections::{hash_map, BTreeSet, HashMap},
    fmt,
    future::Future,
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Instant,
};

use globset::Glob;
use hoard_executor::Executor;
use hoard_stream::{Data, DataReader, Reader, SavedData, SavedDataType, Writer};
use hoard_value::{Dict, TypeRegistry, Value};
use parking_lot::Mutex;

use crate::{
    CacheError, FactoryRegistry, JsonSourceParser, Localizer, ObjectValue, Resource,
    SourceParser, WeakResource, RES_PREFIX, RES_SOURCE,
};

mod event;
use event::{DoneLoading, Flush};

mod loading;
pub(crate) use loading::LoadingInfo;

mod persist;

/// The name of the saved-data child written by [`ResourceCache::save_to_cache`].
const RESOURCES: &str = "resources";

struct ResourceInfo {
    name: Arc<str>,
    saved: SavedData,
    resource: WeakResource,
    loading: Weak<LoadingInfo>,
}

impl ResourceInfo {
    fn new(name: Arc<str>, saved: SavedData) -> Self {
        Self {
            name,
            saved,
            resource: WeakResource::new(),
            loading: Weak::new(),
        }
    }
}

#[derive(Default)]
struct Table {
    entries: HashMap<Arc<str>, ResourceInfo>,
    sources: BTreeSet<PathBuf>,
}

pub(crate) struct CacheInner {
    registry: Arc<TypeRegistry>,
    factories: Arc<FactoryRegistry>,
    localizer: Option<Arc<dyn Localizer>>,
    parser: Arc<dyn SourceParser>,
    executor: Arc<Executor>,
    debug: bool,

    table: Mutex<Table>,
    // Serializes edge insertion into the graph of waiting loads.
    graph: Mutex<()>,
    done: Arc<DoneLoading>,
    next_id: AtomicU64,
}

impl CacheInner {
    fn get_resource_object(self: &Arc<Self>, name: &str) -> Resource {
        let start = Instant::now();
        match self.lookup(name) {
            Some(resource) => resource,
            None => {
                log::warn!(
                    "Missing resource: {name} ({:.1}ms)",
                    start.elapsed().as_secs_f64() * 1000.0
                );
                Resource::new(name, Value::null())
            }
        }
    }

    /// Gets the live resource for `name` and starts loading it when
    /// nobody holds it yet.
    fn lookup(self: &Arc<Self>, name: &str) -> Option<Resource> {
        let (resource, loading, saved) = {
            let mut table = self.table.lock();
            let info = table.entries.get_mut(name)?;

            if let Some(resource) = info.resource.upgrade() {
                return Some(resource);
            }

            let resource = Resource::loading(info.name.clone());
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let loading = Arc::new(LoadingInfo::new(id, resource.clone()));

            resource.set_loading_owner(Arc::downgrade(&loading));
            info.resource = resource.downgrade();
            info.loading = Arc::downgrade(&loading);
            self.done.begin();

            (resource, loading, info.saved.clone())
        };

        log::debug!("Loading: {name}");

        // Spawned outside the table lock; inline executors recurse here.
        let inner = self.clone();
        self.executor
            .spawn(move || inner.run_load(&loading, &saved));

        Some(resource)
    }

    fn run_load(self: &Arc<Self>, loading: &Arc<LoadingInfo>, saved: &SavedData) {
        let value = match saved
            .loaded_data()
            .map_err(hoard_value::Error::from)
            .and_then(|data| self.registry.load_data(data))
        {
            Ok(value) => self.materialize(loading, value),
            Err(e) => {
                log::error!("Failed to load resource '{}': {e}", loading.name());
                Value::null()
            }
        };

        self.update(loading, Some(value));
    }

    fn clear_loading(&self, loading: &Arc<LoadingInfo>) {
        let mut table = self.table.lock();
        if let Some(info) = table.entries.get_mut(loading.name()) {
            if info.loading.as_ptr() == Arc::as_ptr(loading) {
                info.loading = Weak::new();
            }
        }
    }

    fn add_resources(&self, dict: &Dict) -> usize {
        let mut saved = Vec::with_capacity(dict.len());
        let mut sources = Vec::new();

        for (name, value) in dict {
            if name.starts_with(RES_PREFIX) {
                if self.debug && &**name == RES_SOURCE {
                    if let Some(path) = value.get::<String>() {
                        sources.push(PathBuf::from(path));
                    }
                }
                continue;
            }

            match self.registry.save_data(value) {
                Ok(data) => {
                    let len = data.len();
                    saved.push((
                        name.clone(),
                        SavedData::from_data(data, len, SavedDataType::NONE),
                    ));
                }
                Err(e) => log::error!("Failed to persist resource '{name}': {e}"),
            }
        }

        self.install(saved, sources)
    }

    /// Inserts entries for names that are not in the table yet.
    fn install(&self, saved: Vec<(Arc<str>, SavedData)>, sources: Vec<PathBuf>) -> usize {
        let mut table = self.table.lock();
        table.sources.extend(sources);

        let mut added = 0;
        for (name, saved) in saved {
            if let hash_map::Entry::Vacant(e) = table.entries.entry(name.clone()) {
                e.insert(ResourceInfo::new(name, saved));
                added += 1;
            }
        }

        added
    }

    fn rebuild_flushed(self: &Arc<Self>) -> Result<(), CacheError> {
        let sources: Vec<PathBuf> = self.table.lock().sources.iter().cloned().collect();

        // Parse everything first so a broken source leaves the table alone.
        let mut dicts = Vec::with_capacity(sources.len());
        for path in &sources {
            let dict = self
                .parser
                .parse(path, &self.registry, &self.factories, self.debug)
                .map_err(|source| CacheError::Source {
                    path: path.display().to_string(),
                    source,
                })?;
            dicts.push(dict);
        }

        let old: Vec<(Arc<str>, Resource)> = {
            let mut table = self.table.lock();
            table
                .entries
                .drain()
                .filter_map(|(name, info)| info.resource.upgrade().map(|r| (name, r)))
                .collect()
        };

        for dict in &dicts {
            self.add_resources(dict);
        }

        let mut replaced = 0;
        for (name, old) in old {
            if let Some(new) = self.lookup(&name) {
                old.new_resource(&new);
                replaced += 1;
            }
        }

        log::info!(
            "Rebuilt {} sources, replacing {replaced} live resources",
            sources.len()
        );
        Ok(())
    }
}

/// Configures and creates a [`ResourceCache`].
pub struct CacheBuilder {
    registry: Arc<TypeRegistry>,
    factories: Arc<FactoryRegistry>,
    localizer: Option<Arc<dyn Localizer>>,
    parser: Arc<dyn SourceParser>,
    executor: Option<Arc<Executor>>,
    debug: bool,
}

impl CacheBuilder {
    /// Starts building a cache over values of the given registry.
    ///
    /// The registry must contain the resource types, see
    /// [`register_types`](crate::register_types).
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            factories: Arc::new(FactoryRegistry::new()),
            localizer: None,
            parser: Arc::new(JsonSourceParser),
            executor: None,
            debug: false,
        }
    }

    pub fn factories(mut self, factories: impl Into<Arc<FactoryRegistry>>) -> Self {
        self.factories = factories.into();
        self
    }

    pub fn localizer(mut self, localizer: impl Localizer + 'static) -> Self {
        self.localizer = Some(Arc::new(localizer));
        self
    }

    /// Sets the parser used to rebuild from source files.
    pub fn parser(mut self, parser: impl SourceParser + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    /// Sets the executor to load on, instead of one configured from
    /// the environment.
    pub fn executor(mut self, executor: Arc<Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// In debug mode, the cache records the `res:source` of added
    /// resources so that it can rebuild from them.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Creates the cache.
    ///
    /// # Panics
    ///
    /// Panics when the registry lacks the resource types.
    pub fn build(self) -> ResourceCache {
        assert!(
            self.registry.entry_of::<Resource>().is_some()
                && self.registry.entry_of::<ObjectValue>().is_some(),
            "resource types are not registered"
        );

        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(Executor::default()));

        ResourceCache {
            inner: Arc::new(CacheInner {
                registry: self.registry,
                factories: self.factories,
                localizer: self.localizer,
                parser: self.parser,
                executor,
                debug: self.debug,
                table: Mutex::new(Table::default()),
                graph: Mutex::new(()),
                done: Arc::new(DoneLoading::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }
}

/// A cache of named resources that load on first access.
///
/// Names map to the persisted form of their resource. Requesting a
/// name hands out a shared [`Resource`] and loads it in the background
/// while anybody holds it; the cache itself only keeps weak handles.
///
/// Dropping the cache blocks until all loads have finished.
pub struct ResourceCache {
    inner: Arc<CacheInner>,
}

impl ResourceCache {
    /// Creates a cache with default settings; see [`CacheBuilder`].
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        CacheBuilder::new(registry).build()
    }

    #[inline]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.inner.registry
    }

    /// Gets the shared resource for `name`.
    ///
    /// The first request starts a background load. Names which are
    /// not in the cache produce a resource holding the null value.
    pub fn get_resource_object(&self, name: &str) -> Resource {
        self.inner.get_resource_object(name)
    }

    /// Adds the children of `dict` as resources.
    ///
    /// Names that already exist are kept. Returns the number of added
    /// resources.
    pub fn add_resources(&self, dict: &Dict) -> usize {
        self.inner.add_resources(dict)
    }

    /// Adds resources from the binary form written by [`ResourceCache::save`].
    ///
    /// Resource data is not read until it is loaded. Nothing is added
    /// when the stream is malformed.
    pub fn add_resources_from(&self, reader: &mut dyn Reader) -> Result<usize, CacheError> {
        self.inner.add_resources_from(reader)
    }

    /// Adds resources from a dict written by [`ResourceCache::save_to_cache`].
    ///
    /// The `resources` child may also be already loaded data.
    pub fn add_resources_from_cache(&self, dict: &Dict) -> Result<usize, CacheError> {
        let resources = dict.get(RESOURCES).ok_or(CacheError::MissingResources)?;

        let mut reader = if let Some(saved) = resources.get::<SavedData>() {
            saved.loaded_reader()?
        } else if let Some(data) = resources.get::<Data>() {
            DataReader::new(data.clone())
        } else {
            return Err(CacheError::MissingResources);
        };
        self.add_resources_from(&mut reader)
    }

    /// Writes the binary form of all resources and source files.
    pub fn save(&self, writer: &mut dyn Writer) -> Result<(), CacheError> {
        self.inner.save(writer)
    }

    /// Decodes every resource into a child of `dict`.
    pub fn save_to_dict(&self, dict: &mut Dict) -> Result<(), CacheError> {
        self.inner.save_to_dict(dict)
    }

    /// Stores the binary form as the `resources` child of `dict`.
    pub fn save_to_cache(&self, dict: &mut Dict) -> Result<(), CacheError> {
        let data = self.inner.save_to_data()?;
        let len = data.len();

        let saved = SavedData::from_data(data, len, SavedDataType::NONE);
        dict.set(RESOURCES, self.inner.registry.create(saved));
        Ok(())
    }

    /// Gets the names of all resources, sorted.
    pub fn resource_object_names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<_> = self.inner.table.lock().entries.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Gets the sorted names of all resources matching a glob pattern.
    pub fn resource_names_matching(&self, pattern: &str) -> Result<Vec<Arc<str>>, CacheError> {
        let matcher = Glob::new(pattern)?.compile_matcher();

        let mut names = self.resource_object_names();
        names.retain(|name| matcher.is_match(&**name));
        Ok(names)
    }

    /// Gets the source files recorded for rebuilding.
    pub fn source_files(&self) -> Vec<PathBuf> {
        self.inner.table.lock().sources.iter().cloned().collect()
    }

    /// Gets the number of loads currently in flight.
    #[inline]
    pub fn loading_count(&self) -> usize {
        self.inner.done.in_flight()
    }

    /// Blocks until no loads are in flight.
    ///
    /// Must not be called from a resource factory or hook.
    pub fn flush_all_resources(&self) {
        self.inner.done.wait();
    }

    /// Waits without blocking a thread until no loads are in flight.
    pub fn flush_all_resources_async(&self) -> impl Future<Output = ()> + Send + 'static {
        Flush(self.inner.done.clone())
    }

    /// Re-reads all recorded source files and hot-swaps every live
    /// resource onto its freshly built value.
    ///
    /// Loads in flight are finished first. Live resources whose names
    /// no longer exist keep their value.
    pub fn rebuild(&self) -> Result<(), CacheError> {
        self.flush_all_resources();
        self.inner.rebuild_flushed()
    }

    /// Like [`ResourceCache::rebuild`], but waits for loads in flight
    /// without blocking.
    pub async fn rebuild_async(&self) -> Result<(), CacheError> {
        self.flush_all_resources_async().await;
        self.inner.rebuild_flushed()
    }
}

impl fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("resources", &self.inner.table.lock().entries.len())
            .field("loading", &self.loading_count())
            .finish()
    }
}

impl Drop for ResourceCache {
    fn drop(&mut self) {
        self.flush_all_resources();
    }
}
