//! Snapshot runs end to end with a scripted transport and a temp store.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use std::fs;
use std::sync::Arc;

use chrono::{TimeZone as _, Utc};
use ecosnap_cli::{RunMode, run_snapshot};
use ecosnap_collector::{FixedClock, HttpTransport, MetricsCollector, MockTransport};
use ecosnap_core::{Config, Credentials, Error};
use ecosnap_store::SnapshotStore;
use tempfile::TempDir;

const STARS_URL: &str = "https://api.github.test/repos/huggingface/lerobot";
const ROBOTICS_URL: &str = "https://api.github.test/search/repositories?q=topic:robotics&per_page=1";
const LEROBOT_URL: &str = "https://api.github.test/search/repositories?q=topic:lerobot&per_page=1";
const DATASETS_URL: &str = "https://hf.test/api/datasets?filter=lerobot&limit=1000";

fn test_config() -> Config {
    let mut config = Config::default();
    config.http.github_api = "https://api.github.test".to_owned();
    config.http.huggingface_api = "https://hf.test/api".to_owned();
    config
}

fn temp_dir() -> TempDir {
    TempDir::new().unwrap_or_else(|err| panic!("Failed to create temp dir: {err}"))
}

fn collector(transport: &Arc<MockTransport>) -> MetricsCollector {
    let clock = FixedClock(
        Utc.with_ymd_and_hms(2026, 10, 12, 6, 0, 0)
            .single()
            .unwrap_or_else(|| panic!("valid timestamp")),
    );
    MetricsCollector::new(
        Arc::clone(transport) as Arc<dyn HttpTransport>,
        &test_config(),
        &Credentials::default(),
    )
    .with_clock(clock)
}

fn healthy() -> MockTransport {
    MockTransport::new()
        .with_json(STARS_URL, 200, r#"{"stargazers_count": 15000}"#)
        .with_page(
            DATASETS_URL,
            r#"[{"id": "alice/a"}, {"id": "alice/b"}, {"id": "bob/c"}]"#,
            None,
        )
        .with_json(ROBOTICS_URL, 200, r#"{"total_count": 24000}"#)
        .with_json(LEROBOT_URL, 200, r#"{"total_count": 310}"#)
}

#[test]
fn test_two_identical_runs_append_two_rows() {
    let dir = temp_dir();
    let store = SnapshotStore::new(dir.path().join("data").join("weekly_snapshots.csv"));
    let transport = Arc::new(healthy());
    let collector = collector(&transport);

    let first = run_snapshot(&collector, &store, RunMode::Append)
        .unwrap_or_else(|err| panic!("first run failed: {err}"));
    let second = run_snapshot(&collector, &store, RunMode::Append)
        .unwrap_or_else(|err| panic!("second run failed: {err}"));

    assert_eq!(first, second);
    let rows = store
        .load_existing()
        .unwrap_or_else(|err| panic!("load failed: {err}"));
    assert_eq!(rows, [first.clone(), first]);
    assert_eq!(rows[0].unique_uploaders, 2);
}

#[test]
fn test_failed_fetch_leaves_store_untouched() {
    let dir = temp_dir();
    let store = SnapshotStore::new(dir.path().join("history.csv"));
    let good = Arc::new(healthy());
    run_snapshot(&collector(&good), &store, RunMode::Append)
        .unwrap_or_else(|err| panic!("seed run failed: {err}"));
    let before = fs::read(store.path()).unwrap_or_else(|err| panic!("read failed: {err}"));

    let failing = Arc::new(
        MockTransport::new()
            .with_json(STARS_URL, 200, r#"{"stargazers_count": 15001}"#)
            .with_page(DATASETS_URL, r#"[{"id": "alice/a"}]"#, None)
            .with_json(ROBOTICS_URL, 503, "upstream unavailable"),
    );
    let error = run_snapshot(&collector(&failing), &store, RunMode::Append)
        .expect_err("third fetch failure should abort the run");

    assert!(matches!(error, Error::Upstream(_)), "{error:?}");
    assert_eq!(failing.calls_to(LEROBOT_URL), 0);
    let after = fs::read(store.path()).unwrap_or_else(|err| panic!("read failed: {err}"));
    assert_eq!(before, after);
    assert_eq!(store.row_count().unwrap_or_else(|err| panic!("{err}")), 1);
}

#[test]
fn test_dry_run_does_not_create_store() {
    let dir = temp_dir();
    let store = SnapshotStore::new(dir.path().join("history.csv"));
    let transport = Arc::new(healthy());

    let record = run_snapshot(&collector(&transport), &store, RunMode::DryRun)
        .unwrap_or_else(|err| panic!("dry run failed: {err}"));

    assert_eq!(record.topic_lerobot_count, 310);
    assert_eq!(transport.call_count(), 4);
    assert!(!store.path().exists());
}

#[test]
fn test_corrupt_store_aborts_before_any_request() {
    let dir = temp_dir();
    let path = dir.path().join("history.csv");
    fs::write(&path, "timestamp,stars\n2026-09-07T06:00:00Z,14900\n")
        .unwrap_or_else(|err| panic!("write failed: {err}"));
    let store = SnapshotStore::new(&path);
    let transport = Arc::new(healthy());

    let error = run_snapshot(&collector(&transport), &store, RunMode::Append)
        .expect_err("schema mismatch should abort");

    assert!(error.is_corrupt_store(), "{error:?}");
    assert_eq!(transport.call_count(), 0);
}
