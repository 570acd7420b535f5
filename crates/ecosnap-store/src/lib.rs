//! Append-only CSV history of snapshot records.

/// The CSV-backed snapshot store.
pub mod store;

pub use store::SnapshotStore;
