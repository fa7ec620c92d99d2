use std::{
    any::TypeId,
    fmt,
    sync::{Arc, Weak},
};

use arc_swap::ArcSwapOption;
use hoard_value::{TypeRegistry, TypedValue, Value};
use parking_lot::Mutex;

use crate::{cache::LoadingInfo, REF_PREFIX};

// Bounds the walk through values which are themselves resources.
const MAX_REF_DEPTH: usize = 64;

struct Inner {
    name: Arc<str>,
    value: ArcSwapOption<Value>,
    replacement: ArcSwapOption<Inner>,
    loading_owner: Mutex<Weak<LoadingInfo>>,
}

/// A named, shared handle to a value.
///
/// A resource which is still loading reports the null value until
/// its load is finalized. After a rebuild, a resource may learn about
/// a newer resource of the same name through [`Resource::new_resource`];
/// it then reports the newer value as soon as that one is finalized.
#[derive(Clone)]
pub struct Resource(Arc<Inner>);

impl Resource {
    fn from_inner(name: Arc<str>, value: Option<Value>) -> Self {
        Self(Arc::new(Inner {
            name,
            value: ArcSwapOption::new(value.map(Arc::new)),
            replacement: ArcSwapOption::empty(),
            loading_owner: Mutex::new(Weak::new()),
        }))
    }

    /// Creates a finalized resource holding `value`.
    pub fn new(name: impl Into<Arc<str>>, value: Value) -> Self {
        Self::from_inner(name.into(), Some(value))
    }

    pub(crate) fn loading(name: Arc<str>) -> Self {
        Self::from_inner(name, None)
    }

    /// Gets the name of the resource.
    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Gets the latest value of the resource.
    ///
    /// This is the value of the newest finalized replacement, or the
    /// resource's own value, or null while it is still loading.
    ///
    /// The walk shortens the chain: this handle is repointed at the
    /// newest finalized replacement it reached, so superseded
    /// generations are released.
    pub fn value(&self) -> Value {
        let first = self.0.replacement.load_full();
        let mut latest = self.0.value.load_full();
        let mut newest: Option<Arc<Inner>> = None;

        let mut next = first.clone();
        while let Some(inner) = next {
            if let Some(value) = inner.value.load_full() {
                latest = Some(value);
                newest = Some(inner.clone());
            }
            next = inner.replacement.load_full();
        }

        if let Some(newest) = newest {
            let skipped = first.as_ref().is_some_and(|f| !Arc::ptr_eq(f, &newest));
            if skipped {
                self.0.replacement.store(Some(newest));
            }
        }

        latest.map(|v| (*v).clone()).unwrap_or_else(Value::null)
    }

    /// Gets the latest value, following values which are themselves
    /// resources to the value they eventually hold.
    pub fn resolved_value(&self) -> Value {
        let mut value = self.value();
        for _ in 0..MAX_REF_DEPTH {
            let next = match value.get::<Resource>() {
                Some(r) => r.value(),
                None => break,
            };
            value = next;
        }

        value
    }

    /// Whether the resource's own load has been finalized.
    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.0.value.load().is_some()
    }

    /// Whether a load is currently populating this resource.
    #[inline]
    pub fn is_loading(&self) -> bool {
        self.loading_owner().is_some()
    }

    /// Installs a newer resource that supersedes this one.
    ///
    /// A replacement whose own chain leads back to this resource is
    /// ignored, so chains never loop.
    pub fn new_resource(&self, replacement: &Resource) {
        let mut next = Some(replacement.0.clone());
        while let Some(inner) = next {
            if Arc::ptr_eq(&inner, &self.0) {
                log::warn!("Ignoring cyclic replacement of '{}'", self.name());
                return;
            }
            next = inner.replacement.load_full();
        }

        log::debug!("Replacing resource '{}'", self.name());
        self.0.replacement.store(Some(replacement.0.clone()));
    }

    /// Gets the resource installed through [`Resource::new_resource`].
    pub fn replacement(&self) -> Option<Resource> {
        self.0.replacement.load_full().map(Resource)
    }

    pub(crate) fn finalize_value(&self, value: Value) {
        self.0.value.store(Some(Arc::new(value)));
    }

    pub(crate) fn loading_owner(&self) -> Option<Arc<LoadingInfo>> {
        self.0.loading_owner.lock().upgrade()
    }

    pub(crate) fn set_loading_owner(&self, owner: Weak<LoadingInfo>) {
        *self.0.loading_owner.lock() = owner;
    }

    /// Creates a weak handle to this resource.
    pub fn downgrade(&self) -> WeakResource {
        WeakResource(Arc::downgrade(&self.0))
    }

    /// Whether `a` and `b` are the same resource.
    #[inline]
    pub fn ptr_eq(a: &Resource, b: &Resource) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name())
            .field("value", &self.0.value.load().as_deref())
            .finish()
    }
}

/// A weak handle to a [`Resource`].
///
/// Upgrading fails once all strong handles are gone.
#[derive(Clone, Default)]
pub struct WeakResource(Weak<Inner>);

impl WeakResource {
    /// Creates a handle which never upgrades.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upgrade(&self) -> Option<Resource> {
        self.0.upgrade().map(Resource)
    }
}

impl TypedValue for Resource {
    const NAME: &'static str = "resource";

    fn value_eq(&self, other: &Self) -> bool {
        Resource::ptr_eq(self, other)
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values are not printed; references may form cycles.
        write!(f, "<{REF_PREFIX}{}>", self.name())
    }

    fn convert_to(&self, target: TypeId, registry: &TypeRegistry) -> Option<Value> {
        (target == TypeId::of::<String>())
            .then(|| registry.create(format!("{REF_PREFIX}{}", self.name())))
    }
}
