//! Command-line front end for ecosnap.
//!
//! The binary wires configuration, credentials, the collector and the store
//! together; the [`pipeline`] module holds the collect-then-append run so it
//! can be exercised without the binary.

/// Command-line argument definitions.
pub mod cli;
/// Subcommand handlers and exit-code mapping.
pub mod handlers;
/// One snapshot run: collect, log, append.
pub mod pipeline;

pub use cli::{Cli, Commands};
pub use pipeline::{RunMode, run_snapshot};
