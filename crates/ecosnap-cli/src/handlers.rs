use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use ecosnap_collector::{MetricsCollector, ReqwestTransport};
use ecosnap_core::config::presence;
use ecosnap_core::{Api, Config, Credentials, Error, SnapshotRecord};
use ecosnap_store::SnapshotStore;

use crate::cli::{Cli, Commands};
use crate::pipeline::{RunMode, run_snapshot};

/// Exit code for failures without a more specific code.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code when an API rate-limited the run; a token should be provisioned.
pub const EXIT_RATE_LIMITED: u8 = 2;
/// Exit code when the history file does not match the schema.
pub const EXIT_CORRUPT_STORE: u8 = 3;

/// Runs the parsed command.
///
/// # Errors
///
/// Returns the first error encountered, with context describing the step.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Snapshot { store, dry_run } => {
            let mode = if dry_run { RunMode::DryRun } else { RunMode::Append };
            handle_snapshot(&config, store, mode)
        }
        Commands::History { store, limit } => handle_history(&config, store, limit),
        Commands::Config => handle_config(&config),
    }
}

/// Collects one snapshot with the real HTTP transport and stores it.
fn handle_snapshot(config: &Config, store: Option<PathBuf>, mode: RunMode) -> Result<()> {
    let credentials = config.resolve_credentials(Credentials::from_env());
    for api in [Api::GitHub, Api::HuggingFace] {
        if credentials.token_for(api).is_none() {
            tracing::info!(
                "{} is not set; {api} requests are unauthenticated",
                api.token_env_var()
            );
        }
    }

    let transport = Arc::new(ReqwestTransport::new(&config.http)?);
    let collector = MetricsCollector::new(transport, config, &credentials);
    let store = SnapshotStore::new(store_path(config, store));

    run_snapshot(&collector, &store, mode).context("Snapshot run failed")?;
    Ok(())
}

/// Logs the most recent rows and the latest values.
fn handle_history(config: &Config, store: Option<PathBuf>, limit: usize) -> Result<()> {
    let store = SnapshotStore::new(store_path(config, store));
    let rows = store
        .load_existing()
        .with_context(|| format!("Failed to read {}", store.path().display()))?;

    if rows.is_empty() {
        tracing::info!(
            "No snapshots yet in {}. Run `ecosnap snapshot` first.",
            store.path().display()
        );
        return Ok(());
    }

    tracing::info!("{} snapshot(s) in {}", rows.len(), store.path().display());
    tracing::info!("{}", ecosnap_core::SNAPSHOT_COLUMNS.join(","));
    let skip = rows.len().saturating_sub(limit);
    for row in rows.iter().skip(skip) {
        tracing::info!("{}", render_row(row));
    }

    // File order is run order, not necessarily timestamp order.
    if let Some(latest) = rows.iter().max_by_key(|row| row.timestamp) {
        tracing::info!("Latest:");
        for (column, value) in latest.summary_lines() {
            tracing::info!("  {column}: {value}");
        }
    }
    Ok(())
}

/// Logs the effective configuration without revealing tokens.
fn handle_config(config: &Config) -> Result<()> {
    let credentials = config.resolve_credentials(Credentials::from_env());
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;

    tracing::info!("Configuration:\n{rendered}");
    tracing::info!(
        "  GitHub token: {}",
        presence(credentials.token_for(Api::GitHub))
    );
    tracing::info!(
        "  Hugging Face token: {}",
        presence(credentials.token_for(Api::HuggingFace))
    );
    Ok(())
}

fn store_path(config: &Config, store: Option<PathBuf>) -> PathBuf {
    store.unwrap_or_else(|| config.store.path.clone())
}

fn render_row(row: &SnapshotRecord) -> String {
    row.summary_lines().map(|(_, value)| value).join(",")
}

/// Maps an error to the process exit code. Rate limiting and a corrupt store
/// get their own codes.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    match error.chain().find_map(|cause| cause.downcast_ref::<Error>()) {
        Some(core_error) if core_error.is_rate_limited() => EXIT_RATE_LIMITED,
        Some(core_error) if core_error.is_corrupt_store() => EXIT_CORRUPT_STORE,
        _ => EXIT_FAILURE,
    }
}
