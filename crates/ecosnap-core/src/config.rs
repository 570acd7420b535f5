//! Configuration for targets, HTTP behaviour, storage, and credentials.

use core::fmt;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Api, Error, Result};

/// Complete ecosnap configuration.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What to measure
    pub targets: TargetsConfig,
    /// HTTP endpoints and limits
    pub http: HttpConfig,
    /// Snapshot history location
    pub store: StoreConfig,
    /// Tokens read from the config file; the environment fills gaps
    #[serde(skip_serializing)]
    pub credentials: Credentials,
}

/// Repository, dataset tag and topics to track.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetsConfig {
    /// Owner of the repository whose stars are counted
    pub repo_owner: String,
    /// Name of the repository whose stars are counted
    pub repo_name: String,
    /// Hugging Face dataset tag
    pub dataset_tag: String,
    /// Topic reported in `topic_robotics_count`
    pub primary_topic: String,
    /// Topic reported in `topic_lerobot_count`
    pub secondary_topic: String,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            repo_owner: "huggingface".to_owned(),
            repo_name: "lerobot".to_owned(),
            dataset_tag: "lerobot".to_owned(),
            primary_topic: "robotics".to_owned(),
            secondary_topic: "lerobot".to_owned(),
        }
    }
}

/// HTTP endpoints, timeouts and pagination bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Base URL of the GitHub REST API
    pub github_api: String,
    /// Base URL of the Hugging Face Hub API
    pub huggingface_api: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
    /// Datasets requested per listing page
    pub page_size: usize,
    /// Upper bound on listing pages fetched in one run
    pub max_pages: usize,
    /// `User-Agent` header sent with every request
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            github_api: "https://api.github.com".to_owned(),
            huggingface_api: "https://huggingface.co/api".to_owned(),
            timeout_seconds: 30,
            page_size: 1000,
            max_pages: 1000,
            user_agent: concat!("ecosnap/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl HttpConfig {
    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Snapshot history location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the CSV history
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/weekly_snapshots.csv"),
        }
    }
}

/// Optional bearer tokens for the two APIs.
#[derive(Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Token for the GitHub API
    pub github_token: Option<String>,
    /// Token for the Hugging Face API
    pub huggingface_token: Option<String>,
}

impl Credentials {
    /// Reads `GITHUB_TOKEN` and `HF_TOKEN` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds credentials from an arbitrary variable lookup. Blank values
    /// count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |api: Api| {
            lookup(api.token_env_var())
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        Self {
            github_token: read(Api::GitHub),
            huggingface_token: read(Api::HuggingFace),
        }
    }

    /// Fills tokens missing from `self` with those from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            github_token: self.github_token.or(fallback.github_token),
            huggingface_token: self.huggingface_token.or(fallback.huggingface_token),
        }
    }

    /// Token for the given API, if any.
    pub fn token_for(&self, api: Api) -> Option<&str> {
        match api {
            Api::GitHub => self.github_token.as_deref(),
            Api::HuggingFace => self.huggingface_token.as_deref(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |token: &Option<String>| if token.is_some() { "<set>" } else { "<unset>" };
        formatter
            .debug_struct("Credentials")
            .field("github_token", &redact(&self.github_token))
            .field("huggingface_token", &redact(&self.huggingface_token))
            .finish()
    }
}

impl Config {
    /// Loads the config file at `path`, or the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let contents = fs::read_to_string(path).map_err(|error| {
                    Error::Config(format!("failed to read {}: {error}", path.display()))
                })?;
                let config = Self::from_toml_str(&contents)?;
                tracing::debug!(
                    "Loaded config from {}: github_token={}, huggingface_token={}",
                    path.display(),
                    presence(config.credentials.github_token.as_ref()),
                    presence(config.credentials.huggingface_token.as_ref()),
                );
                config
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Toml`] on malformed input.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Checks that limits are positive and targets non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_seconds == 0 {
            return Err(Error::Config("http.timeout_seconds must be positive".to_owned()));
        }
        if self.http.page_size == 0 {
            return Err(Error::Config("http.page_size must be positive".to_owned()));
        }
        if self.http.max_pages == 0 {
            return Err(Error::Config("http.max_pages must be positive".to_owned()));
        }
        let targets = [
            ("targets.repo_owner", &self.targets.repo_owner),
            ("targets.repo_name", &self.targets.repo_name),
            ("targets.dataset_tag", &self.targets.dataset_tag),
            ("targets.primary_topic", &self.targets.primary_topic),
            ("targets.secondary_topic", &self.targets.secondary_topic),
        ];
        if let Some((name, _)) = targets.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(Error::Config(format!("{name} must not be empty")));
        }
        Ok(())
    }

    /// File tokens first, then the given environment credentials.
    pub fn resolve_credentials(&self, environment: Credentials) -> Credentials {
        self.credentials.clone().or(environment)
    }
}

/// "present"/"missing" for log lines that must not echo secrets.
pub fn presence<T: ?Sized>(value: Option<&T>) -> &'static str {
    if value.is_some() { "present" } else { "missing" }
}
