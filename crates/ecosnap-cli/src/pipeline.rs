use ecosnap_collector::MetricsCollector;
use ecosnap_core::{Result, SnapshotRecord};
use ecosnap_store::SnapshotStore;

/// Whether a run writes to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Append the collected record
    Append,
    /// Collect and log only
    DryRun,
}

/// Collects one snapshot, logs it, and appends it to `store`.
///
/// The store header is checked before any request is made, and nothing is
/// written unless every fetch succeeded.
///
/// # Errors
///
/// Returns [`ecosnap_core::Error::CorruptStore`] for a store with the wrong
/// header, [`ecosnap_core::Error::Upstream`] if collection fails, or an I/O
/// error if the row cannot be written.
pub fn run_snapshot(
    collector: &MetricsCollector,
    store: &SnapshotStore,
    mode: RunMode,
) -> Result<SnapshotRecord> {
    store.verify_header()?;

    let record = collector.collect()?;
    log_snapshot(&record);

    match mode {
        RunMode::Append => {
            store.append(&record)?;
            tracing::info!("Snapshot saved to {}", store.path().display());
        }
        RunMode::DryRun => {
            tracing::info!("Dry run: {} left untouched", store.path().display());
        }
    }

    Ok(record)
}

fn log_snapshot(record: &SnapshotRecord) {
    tracing::info!("Snapshot collected:");
    for (column, value) in record.summary_lines() {
        tracing::info!("  {column}: {value}");
    }
}
