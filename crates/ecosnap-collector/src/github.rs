use std::sync::Arc;

use ecosnap_core::{Api, UpstreamError};
use serde::Deserialize;

use crate::transport::{HttpRequest, HttpTransport, decode_json, send};

/// Media type requested from the GitHub REST API.
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
/// Pinned REST API version.
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Client for the two GitHub endpoints ecosnap reads.
pub struct GitHubClient {
    /// Transport used for every request.
    transport: Arc<dyn HttpTransport>,
    /// Base URL without trailing slash.
    base_url: String,
    /// Optional bearer token.
    token: Option<String>,
}

/// Subset of `GET /repos/{owner}/{repo}`.
#[derive(Debug, Deserialize)]
struct RepoResponse {
    /// Star count.
    stargazers_count: u64,
}

/// Subset of the `GET /search/repositories` envelope.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// Number of matching repositories, independent of page size.
    total_count: u64,
}

impl GitHubClient {
    /// Creates a client for `base_url`.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token,
        }
    }

    /// Star count of `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns an [`UpstreamError`] on a failed request or when
    /// `stargazers_count` is missing or not a non-negative integer.
    pub fn fetch_repo_stars(&self, owner: &str, repo: &str) -> Result<u64, UpstreamError> {
        let request = self.request(format!("{}/repos/{owner}/{repo}", self.base_url));
        let response = send(self.transport.as_ref(), Api::GitHub, &request)?;
        let payload: RepoResponse = decode_json(Api::GitHub, &request.full_url(), &response.body)?;
        tracing::debug!(owner, repo, stars = payload.stargazers_count, "repository stars");
        Ok(payload.stargazers_count)
    }

    /// Number of repositories tagged with `topic`, read from the search
    /// envelope's `total_count` rather than the length of the result page.
    ///
    /// # Errors
    ///
    /// Returns an [`UpstreamError`] on a failed request or a malformed envelope.
    pub fn fetch_topic_repo_count(&self, topic: &str) -> Result<u64, UpstreamError> {
        let request = self
            .request(format!("{}/search/repositories", self.base_url))
            .query("q", format!("topic:{topic}"))
            .query("per_page", "1");
        let response = send(self.transport.as_ref(), Api::GitHub, &request)?;
        let payload: SearchResponse =
            decode_json(Api::GitHub, &request.full_url(), &response.body)?;
        tracing::debug!(topic, count = payload.total_count, "topic repositories");
        Ok(payload.total_count)
    }

    /// GET request with the GitHub headers and token attached.
    fn request(&self, url: String) -> HttpRequest {
        HttpRequest::get(url)
            .header("Accept", GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .bearer(self.token.as_deref())
    }
}
