use std::{
    collections::HashSet,
    mem,
    sync::{Arc, Weak},
    time::Instant,
};

use hoard_stream::{Data, SavedData, SavedDataType};
use hoard_value::{Dict, Value};
use parking_lot::Mutex;

use super::CacheInner;
use crate::{ObjectValue, Resource, LOC_PREFIX, REF_PREFIX, RES_TYPE};

struct LoadState {
    // The load itself plus every unfinished load it references.
    blocked: usize,
    // Loads waiting for this one to finish.
    parents: Vec<Arc<LoadingInfo>>,
    final_value: Value,
}

/// Bookkeeping for one in-flight load.
pub(crate) struct LoadingInfo {
    id: u64,
    resource: Resource,
    start: Instant,
    state: Mutex<LoadState>,
}

impl LoadingInfo {
    pub(super) fn new(id: u64, resource: Resource) -> Self {
        Self {
            id,
            resource,
            start: Instant::now(),
            state: Mutex::new(LoadState {
                blocked: 1,
                parents: Vec::new(),
                final_value: Value::null(),
            }),
        }
    }

    #[inline]
    pub(super) fn name(&self) -> &str {
        self.resource.name()
    }
}

impl CacheInner {
    /// Turns a decoded value into its live form.
    ///
    /// Dicts and lists are rebuilt with their children materialized,
    /// `ref:` and `loc:` strings are resolved and all other saved data
    /// is read.
    pub(super) fn materialize(self: &Arc<Self>, loading: &Arc<LoadingInfo>, value: Value) -> Value {
        if value.is_null() {
            return value;
        }

        if let Some(dict) = self.as_dict(&value) {
            return self.materialize_dict(loading, dict);
        }

        if let Some(list) = value.get::<Vec<Value>>() {
            let list: Vec<Value> = list
                .iter()
                .map(|child| self.materialize(loading, child.clone()))
                .collect();
            return self.registry.create(list);
        }

        if value.is::<String>() || value.is::<Resource>() {
            let Some(text) = value.try_convert::<String>(&self.registry) else {
                return value;
            };
            let text = text.get::<String>().map_or("", String::as_str);

            if let Some(name) = text.strip_prefix(REF_PREFIX) {
                return self.reference(loading, name);
            }
            if let Some(name) = text.strip_prefix(LOC_PREFIX) {
                return self.localize(loading, name);
            }
            return value;
        }

        if value.is::<SavedData>() {
            return match value.try_convert::<Data>(&self.registry) {
                Some(data) => data,
                None => {
                    log::error!("Failed to read saved data in '{}'", loading.name());
                    Value::null()
                }
            };
        }

        value
    }

    fn as_dict(&self, value: &Value) -> Option<Dict> {
        if let Some(dict) = value.get::<Dict>() {
            return Some(dict.clone());
        }

        let saved = value.get::<SavedData>()?;
        if !saved.kind().contains(SavedDataType::DICT) {
            return None;
        }

        match Dict::from_saved(saved, &self.registry) {
            Ok(dict) => Some(dict),
            Err(e) => {
                log::error!("Failed to read saved dict: {e}");
                None
            }
        }
    }

    fn materialize_dict(self: &Arc<Self>, loading: &Arc<LoadingInfo>, dict: Dict) -> Value {
        let ty = dict.get(RES_TYPE).and_then(|v| v.get::<String>()).cloned();
        let dict: Dict = dict
            .into_iter()
            .map(|(name, child)| {
                let child = self.materialize(loading, child);
                (name, child)
            })
            .collect();

        let Some(ty) = ty else {
            return self.registry.create(dict);
        };
        let Some(factory) = self.factories.get(&ty) else {
            log::warn!("No factory for '{ty}' in '{}'", loading.name());
            return self.registry.create(dict);
        };

        match factory.load_from_cache(&dict, &self.registry) {
            Some(object) => self.registry.create(ObjectValue(object)),
            None => {
                log::error!("Factory '{ty}' failed to load '{}'", loading.name());
                Value::null()
            }
        }
    }

    fn reference(self: &Arc<Self>, loading: &Arc<LoadingInfo>, name: &str) -> Value {
        let resource = self.get_resource_object(name);
        if let Some(child) = resource.loading_owner() {
            self.block_on(loading, &child);
        }

        self.registry.create(resource)
    }

    fn localize(&self, loading: &LoadingInfo, name: &str) -> Value {
        match self.localizer.as_ref().and_then(|l| l.localize(name)) {
            Some(value) => value,
            None => {
                log::warn!("No localized value '{name}' for '{}'", loading.name());
                Value::null()
            }
        }
    }

    /// Makes `parent` wait for `child` unless `child` already finished.
    ///
    /// An edge that would close a cycle is skipped, so the load that
    /// discovers the cycle does not wait.
    fn block_on(&self, parent: &Arc<LoadingInfo>, child: &Arc<LoadingInfo>) {
        let _graph = self.graph.lock();

        if is_waiting_on(child, parent) {
            log::warn!(
                "Not blocking '{}' on '{}': cyclic reference",
                parent.name(),
                child.name()
            );
            return;
        }

        // Both records are locked in id order.
        let (first, second) = if parent.id < child.id {
            (parent, child)
        } else {
            (child, parent)
        };
        let mut first = first.state.lock();
        let mut second = second.state.lock();
        let (p, c) = if parent.id < child.id {
            (&mut *first, &mut *second)
        } else {
            (&mut *second, &mut *first)
        };

        if c.blocked == 0 {
            return;
        }

        log::debug!("Blocking: '{}' blocked by '{}'", parent.name(), child.name());
        p.blocked += 1;
        c.parents.push(parent.clone());
    }

    /// Counts one blocker of `loading` as done and publishes the value
    /// once none are left.
    pub(super) fn update(self: &Arc<Self>, loading: &Arc<LoadingInfo>, value: Option<Value>) {
        let parents = {
            let mut state = loading.state.lock();
            debug_assert!(state.blocked > 0, "load updated after finishing");
            state.blocked = state.blocked.saturating_sub(1);

            if let Some(value) = value {
                state.final_value = value;
            }

            let done = state.blocked == 0;
            log::debug!(
                "Update: {} ({}, {})",
                loading.name(),
                state.blocked,
                if done { "done" } else { "blocked" }
            );
            if !done {
                return;
            }

            let mut value = mem::take(&mut state.final_value);
            let rejected = value
                .get::<ObjectValue>()
                .is_some_and(|object| !object.0.load_complete(false));
            if rejected {
                log::error!("Resource '{}' failed to complete loading", loading.name());
                value = Value::null();
            }

            loading.resource.finalize_value(value);
            mem::take(&mut state.parents)
        };

        loading.resource.set_loading_owner(Weak::new());
        self.clear_loading(loading);

        for parent in parents {
            log::debug!(
                "Unblocking: '{}' unblocked by '{}'",
                parent.name(),
                loading.name()
            );
            self.update(&parent, None);
        }

        log::info!(
            "Loaded: {} ({:.1}ms)",
            loading.name(),
            loading.start.elapsed().as_secs_f64() * 1000.0
        );
        self.done.end();
    }
}

/// Whether `waiter` transitively waits for `load` to finish.
fn is_waiting_on(waiter: &Arc<LoadingInfo>, load: &Arc<LoadingInfo>) -> bool {
    let mut stack = vec![load.clone()];
    let mut seen = HashSet::new();

    while let Some(node) = stack.pop() {
        if node.id == waiter.id {
            return true;
        }
        if !seen.insert(node.id) {
            continue;
        }

        stack.extend(node.state.lock().parents.iter().cloned());
    }

    false
}
