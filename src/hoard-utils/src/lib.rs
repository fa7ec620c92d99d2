//! Shared utility code throughout the hoard project.

#![deny(rust_2018_idioms, rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod binary;
pub mod hash;
