//! Internal implementation modules for `pyrig-core`.
//!
//! Most callers should go through the re-exports at the crate root.

pub mod archive;
pub mod commands;
pub mod config;
pub mod errors;
pub mod net;
pub mod patch;
pub mod process;
pub mod provision;
pub mod python;
pub mod store;
pub mod tooling;
