//! # Storage Module
//!
//! Persistence for the registry. The core does not pick a database: it
//! produces a versioned, self-validating [`RegistrySnapshot`] and offers
//! plain-file [`save`] / [`load`] helpers for callers that just need a file.

pub mod snapshot;

pub use snapshot::{load, save, RegistrySnapshot, SnapshotError};
