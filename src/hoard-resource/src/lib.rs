//! A cache of named resources which are loaded in the background.
//!
//! Resources are stored in their persisted form and only turned into
//! live objects when first requested through [`ResourceCache`]. While
//! a resource loads, `ref:` strings inside of it are resolved into
//! handles to other resources, which get loaded concurrently. A load
//! is published only once every resource it references has finished.
//!
//! Handed out [`Resource`]s stay valid across [`ResourceCache::rebuild`],
//! which swaps fresh values in underneath them.

#![deny(rust_2018_idioms, rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

use std::io;

use hoard_stream::StreamError;
use hoard_value::TypeRegistry;
use thiserror::Error;

mod cache;
pub use cache::{CacheBuilder, ResourceCache};

mod nested;
pub use nested::{CacheFactory, RESOURCE_CACHE_TYPE};

mod object;
pub use object::*;

mod resource;
pub use resource::{Resource, WeakResource};

mod source;
pub use source::*;

/// Names starting with this prefix carry cache metadata.
pub const RES_PREFIX: &str = "res:";
/// The child of a dict naming the factory that builds it.
pub const RES_TYPE: &str = "res:type";
/// The top-level child recording the source file of a build.
pub const RES_SOURCE: &str = "res:source";
/// Strings with this prefix reference another resource by name.
pub const REF_PREFIX: &str = "ref:";
/// Strings with this prefix are looked up in the localizer.
pub const LOC_PREFIX: &str = "loc:";

/// Errors that may occur when filling or persisting a cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Value(#[from] hoard_value::Error),

    #[error("{0}")]
    Stream(#[from] StreamError),

    /// A block of the persisted cache does not start with its cookie.
    #[error("bad cookie for the {0} block of a persisted cache")]
    BadCookie(&'static str),

    /// A persisted cache ends before all of its data.
    #[error("persisted cache is truncated: {0}")]
    Truncated(String),

    /// A persisted cache dict has no `resources` child.
    #[error("dict holds no persisted resources")]
    MissingResources,

    /// A source file could not be rebuilt.
    #[error("failed to rebuild '{path}': {source}")]
    Source {
        path: String,
        #[source]
        source: SourceError,
    },

    /// A name pattern is malformed.
    #[error("{0}")]
    Pattern(#[from] globset::Error),
}

/// Registers the value types of resources and resource objects.
///
/// Registries passed to a [`CacheBuilder`] must contain them.
pub fn register_types(registry: &mut TypeRegistry) {
    if registry.entry_of::<Resource>().is_none() {
        registry.register::<Resource>();
    }
    if registry.entry_of::<ObjectValue>().is_none() {
        registry.register::<ObjectValue>();
    }
}

/// Creates a registry with the builtin and resource value types.
pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    register_types(&mut registry);
    registry
}
