use std::sync::Arc;

use chrono::{DateTime, SubsecRound as _, Utc};
use ecosnap_core::{Api, Config, Credentials, Result, SnapshotRecord, TargetsConfig};

use crate::github::GitHubClient;
use crate::huggingface::HuggingFaceClient;
use crate::transport::HttpTransport;

/// Source of the capture timestamp.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Gathers one [`SnapshotRecord`] from GitHub and Hugging Face.
pub struct MetricsCollector {
    /// GitHub client for stars and topic counts.
    github: GitHubClient,
    /// Hugging Face client for the dataset listing.
    huggingface: HuggingFaceClient,
    /// What to measure.
    targets: TargetsConfig,
    /// Timestamp source.
    clock: Box<dyn Clock>,
}

impl MetricsCollector {
    /// Builds a collector whose clients share `transport`.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        config: &Config,
        credentials: &Credentials,
    ) -> Self {
        let github = GitHubClient::new(
            Arc::clone(&transport),
            config.http.github_api.as_str(),
            credentials.token_for(Api::GitHub).map(str::to_owned),
        );
        let huggingface = HuggingFaceClient::new(
            transport,
            config.http.huggingface_api.as_str(),
            credentials.token_for(Api::HuggingFace).map(str::to_owned),
        )
        .with_page_size(config.http.page_size)
        .with_max_pages(config.http.max_pages);

        Self {
            github,
            huggingface,
            targets: config.targets.clone(),
            clock: Box::new(SystemClock),
        }
    }

    /// Replaces the timestamp source.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Runs every fetch in order (stars, datasets, primary topic, secondary
    /// topic) and assembles the record. The first failure aborts collection,
    /// so a record is either complete or not produced at all.
    ///
    /// # Errors
    ///
    /// Returns [`ecosnap_core::Error::Upstream`] from the first failing fetch.
    pub fn collect(&self) -> Result<SnapshotRecord> {
        let timestamp = self.clock.now().trunc_subsecs(0);
        let targets = &self.targets;

        let star_count = self
            .github
            .fetch_repo_stars(&targets.repo_owner, &targets.repo_name)?;
        let (dataset_count, unique_uploaders) = self
            .huggingface
            .fetch_dataset_count_and_uploaders(&targets.dataset_tag)?;
        let topic_robotics_count = self.github.fetch_topic_repo_count(&targets.primary_topic)?;
        let topic_lerobot_count = self
            .github
            .fetch_topic_repo_count(&targets.secondary_topic)?;

        Ok(SnapshotRecord {
            timestamp,
            star_count,
            dataset_count,
            unique_uploaders,
            topic_robotics_count,
            topic_lerobot_count,
        })
    }
}
