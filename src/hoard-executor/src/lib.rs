//! Implementation of a worker pool for background loading.
//!
//! # Design
//!
//! Jobs are fire-and-forget closures. They communicate their results
//! through shared state of their own and never block on each other,
//! so a job may freely spawn more jobs from inside a worker.
//!
//! The single-threaded flavor runs every job inline at the point it
//! is spawned, which keeps behavior deterministic for tests and for
//! systems without spare cores.

#![deny(rust_2018_idioms, rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod executor;
pub use executor::*;
