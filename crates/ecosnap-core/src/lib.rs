//! Core types for ecosnap.
//!
//! This crate provides the snapshot record and its CSV schema, the error
//! types shared by the collector and the store, and configuration loading.

/// Configuration and credentials.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// The snapshot record and its column schema.
pub mod record;

pub use config::{Config, Credentials, HttpConfig, StoreConfig, TargetsConfig};
pub use error::{Api, Error, Result, UpstreamError, UpstreamFailure};
pub use record::{SNAPSHOT_COLUMNS, SnapshotRecord};
