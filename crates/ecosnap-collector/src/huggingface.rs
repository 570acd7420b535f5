use std::collections::HashSet;
use std::sync::Arc;

use ecosnap_core::{Api, UpstreamError, UpstreamFailure};
use serde::Deserialize;

use crate::transport::{HttpRequest, HttpTransport, decode_json, send};

/// Client for the Hugging Face dataset listing.
pub struct HuggingFaceClient {
    /// Transport used for every page.
    transport: Arc<dyn HttpTransport>,
    /// Base URL without trailing slash.
    base_url: String,
    /// Optional bearer token.
    token: Option<String>,
    /// Items requested per page.
    page_size: usize,
    /// Pages fetched before giving up.
    max_pages: usize,
}

/// One entry of `GET /api/datasets`. Only identity fields are read.
#[derive(Debug, Deserialize)]
struct DatasetItem {
    /// Qualified identifier, `owner/name`.
    id: Option<String>,
    /// Owning user or organisation.
    author: Option<String>,
}

impl HuggingFaceClient {
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
            page_size: 1000,
            max_pages: 1000,
        }
    }

    /// Sets the listing page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the page bound.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Walks every listing page for `tag` and returns
    /// `(dataset_count, unique_uploaders)`.
    ///
    /// Pages are followed through the `Link: rel="next"` cursor until a page
    /// comes back empty or without a next link.
    ///
    /// # Errors
    ///
    /// Returns an [`UpstreamError`] if any page fails, if a page is not a JSON
    /// array, if more than `max_pages` pages would be needed, or if a next
    /// link points back at a page already fetched.
    pub fn fetch_dataset_count_and_uploaders(
        &self,
        tag: &str,
    ) -> Result<(u64, u64), UpstreamError> {
        let mut request = HttpRequest::get(format!("{}/datasets", self.base_url))
            .query("filter", tag)
            .query("limit", self.page_size.to_string())
            .bearer(self.token.as_deref());
        let mut visited = HashSet::from([request.full_url()]);
        let mut owners: HashSet<String> = HashSet::new();
        let mut dataset_count: u64 = 0;
        let mut pages = 0_usize;

        loop {
            if pages >= self.max_pages {
                return Err(UpstreamError::new(
                    Api::HuggingFace,
                    request.full_url(),
                    UpstreamFailure::PaginationLimit { pages },
                ));
            }

            let response = send(self.transport.as_ref(), Api::HuggingFace, &request)?;
            pages += 1;
            let items: Vec<DatasetItem> =
                decode_json(Api::HuggingFace, &request.full_url(), &response.body)?;
            tracing::debug!(tag, page = pages, items = items.len(), "dataset page");

            if items.is_empty() {
                break;
            }
            dataset_count += items.len() as u64;
            owners.extend(
                items
                    .iter()
                    .filter_map(|item| owner_of(item.id.as_deref(), item.author.as_deref())),
            );

            let Some(next) = response.next_link else {
                break;
            };
            if !visited.insert(next.clone()) {
                return Err(UpstreamError::new(
                    Api::HuggingFace,
                    request.full_url(),
                    UpstreamFailure::PaginationLoop { url: next },
                ));
            }
            request = HttpRequest::get(next).bearer(self.token.as_deref());
        }

        tracing::debug!(
            tag,
            pages,
            datasets = dataset_count,
            uploaders = owners.len(),
            "dataset listing complete"
        );
        Ok((dataset_count, owners.len() as u64))
    }
}

/// Owner of a dataset: the part of `id` before the first `/`, falling back to
/// `author` for unqualified ids. Normalized to trimmed lowercase so that
/// `Alice/x` and `alice/y` count once.
pub fn owner_of(id: Option<&str>, author: Option<&str>) -> Option<String> {
    let from_id = id
        .and_then(|id| id.split_once('/'))
        .map(|(owner, _)| owner.trim())
        .filter(|owner| !owner.is_empty());
    let from_author = || author.map(str::trim).filter(|author| !author.is_empty());
    from_id.or_else(from_author).map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    #[test]
    fn test_owner_from_qualified_id() {
        assert_eq!(owner_of(Some("alice/pick-place"), None).as_deref(), Some("alice"));
        assert_eq!(
            owner_of(Some("Lerobot/aloha_sim"), Some("ignored")).as_deref(),
            Some("lerobot")
        );
    }

    #[test]
    fn test_owner_falls_back_to_author() {
        assert_eq!(owner_of(Some("legacy-dataset"), Some(" Bob ")).as_deref(), Some("bob"));
        assert_eq!(owner_of(None, Some("carol")).as_deref(), Some("carol"));
        assert_eq!(owner_of(Some("/orphan"), Some("")), None);
        assert_eq!(owner_of(None, None), None);
    }

    #[test]
    fn test_single_page_without_link_is_terminal() {
        let transport = Arc::new(MockTransport::new().with_json(
            "https://hf.test/api/datasets?filter=lerobot&limit=1000",
            200,
            r#"[{"id": "alice/a"}, {"id": "bob/b"}, {"id": "unqualified"}]"#,
        ));
        let client = HuggingFaceClient::new(
            Arc::clone(&transport) as Arc<dyn HttpTransport>,
            "https://hf.test/api",
            None,
        );
        let (datasets, uploaders) = client
            .fetch_dataset_count_and_uploaders("lerobot")
            .unwrap_or_else(|err| panic!("listing: {err}"));
        assert_eq!(datasets, 3);
        assert_eq!(uploaders, 2);
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn test_non_array_page_is_invalid_body() {
        let transport = Arc::new(MockTransport::new().with_json(
            "https://hf.test/api/datasets?filter=lerobot&limit=1000",
            200,
            r#"{"error": "unexpected"}"#,
        ));
        let client = HuggingFaceClient::new(
            Arc::clone(&transport) as Arc<dyn HttpTransport>,
            "https://hf.test/api",
            None,
        );
        let Err(error) = client.fetch_dataset_count_and_uploaders("lerobot") else {
            panic!("object body should fail");
        };
        assert!(matches!(error.failure, UpstreamFailure::InvalidBody { .. }));
    }

    #[test]
    fn test_zero_limits_are_clamped() {
        let client = HuggingFaceClient::new(
            Arc::new(MockTransport::new()) as Arc<dyn HttpTransport>,
            "https://hf.test/api",
            None,
        )
        .with_page_size(0)
        .with_max_pages(0);
        assert_eq!(client.page_size, 1);
        assert_eq!(client.max_pages, 1);
    }
}
