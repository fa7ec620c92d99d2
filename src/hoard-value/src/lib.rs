//! Runtime-typed, shared values with binary persistence.
//!
//! A [`Value`] holds exactly one payload of a type that was registered
//! in a [`TypeRegistry`]. The registry maps each type to a stable
//! persisted tag, so values can be saved with [`TypeRegistry::save_typed`]
//! and read back with [`TypeRegistry::load_typed`] by any build that
//! knows the same types.
//!
//! [`Dict`] is the universal interchange structure: a mapping of names
//! to values which is itself a value.

#![deny(rust_2018_idioms, rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

use std::{io, string::FromUtf8Error};

use hoard_stream::StreamError;
use thiserror::Error;

mod builtins;

mod dict;
pub use dict::Dict;

mod registry;
pub use registry::*;

mod types;
pub use types::*;

mod value;
pub use value::Value;

/// Errors that may occur when loading or saving values.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred while working with a stream.
    #[error("{0}")]
    Io(#[from] io::Error),

    /// Saved data could not be materialized.
    #[error("{0}")]
    Stream(#[from] StreamError),

    /// A persisted type tag is not known to the registry.
    #[error("unknown persisted type tag {0:#010x}")]
    UnknownType(u32),

    /// A persisted string is not valid UTF-8.
    #[error("{0}")]
    Utf8(#[from] FromUtf8Error),

    /// A value cannot be represented as the requested type.
    #[error("cannot convert '{from}' to '{to}'")]
    NotConvertible {
        from: &'static str,
        to: &'static str,
    },

    /// The type of a value has no persisted form.
    #[error("values of type '{0}' cannot be persisted")]
    NotPersistable(&'static str),
}
