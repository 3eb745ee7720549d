//! Internal implementation modules for `msync-core`.
//!
//! Callers should use the items re-exported from the crate root.

pub mod catalog;
pub mod config;
pub mod error;
pub mod net;
pub mod rebuild;
pub mod source;
pub mod update;
