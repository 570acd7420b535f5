use core::result::Result as StdResult;

use ecosnap_core::{Api, Error, HttpConfig, Result, UpstreamError, UpstreamFailure};
use reqwest::blocking::Client;
use reqwest::header::LINK;
use serde::de::DeserializeOwned;
use thiserror::Error as ThisError;

use crate::link::parse_next_link;

/// A GET request against one of the upstream APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL, possibly already carrying a query string.
    pub url: String,
    /// Extra query parameters appended to `url`.
    pub query: Vec<(String, String)>,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// Bearer token for the `Authorization` header.
    pub bearer: Option<String>,
}

impl HttpRequest {
    /// Creates a GET request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            bearer: None,
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attaches a bearer token when one is available.
    #[must_use]
    pub fn bearer(mut self, token: Option<&str>) -> Self {
        self.bearer = token.map(str::to_owned);
        self
    }

    /// URL with the query parameters appended, unencoded. Used for log lines,
    /// error context and mock routing.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        let pairs: Vec<String> = self
            .query
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        format!("{}{separator}{}", self.url, pairs.join("&"))
    }
}

/// What came back from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
    /// `rel="next"` target from the `Link` header.
    pub next_link: Option<String>,
}

impl HttpResponse {
    /// A response with no `Link` header.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            next_link: None,
        }
    }

    /// Sets the next-page link.
    #[must_use]
    pub fn with_next_link(mut self, link: impl Into<String>) -> Self {
        self.next_link = Some(link.into());
        self
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure before any HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum TransportError {
    /// The request exceeded the client timeout.
    #[error("request timed out")]
    Timeout,
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),
    /// Any other client-side failure.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Classifies a reqwest error.
    fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else {
            Self::Other(error.to_string())
        }
    }
}

/// Performs blocking GET requests.
pub trait HttpTransport: Send + Sync {
    /// Sends `request` and returns the raw response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no response was received.
    fn get(&self, request: &HttpRequest) -> StdResult<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by `reqwest::blocking`.
pub struct ReqwestTransport {
    /// Shared HTTP client carrying the timeout and user agent.
    client: Client,
}

impl ReqwestTransport {
    /// Builds a client with the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the TLS backend cannot be initialised.
    pub fn new(http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(http.timeout())
            .user_agent(http.user_agent.as_str())
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, request: &HttpRequest) -> StdResult<HttpResponse, TransportError> {
        let mut builder = self.client.get(&request.url).query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .map_err(|error| TransportError::from_reqwest(&error))?;
        let status = response.status().as_u16();
        let next_link = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_next_link);
        let body = response
            .text()
            .map_err(|error| TransportError::from_reqwest(&error))?;

        Ok(HttpResponse {
            status,
            body,
            next_link,
        })
    }
}

/// Sends `request` and turns transport failures and non-2xx statuses into
/// [`UpstreamError`]s. 403 and 429 are reported as rate limiting.
///
/// # Errors
///
/// Returns an [`UpstreamError`] unless the server answered 2xx.
pub fn send(
    transport: &dyn HttpTransport,
    api: Api,
    request: &HttpRequest,
) -> StdResult<HttpResponse, UpstreamError> {
    let endpoint = request.full_url();
    tracing::debug!(%api, %endpoint, authenticated = request.bearer.is_some(), "GET");

    let response = transport.get(request).map_err(|error| {
        let failure = match error {
            TransportError::Timeout => UpstreamFailure::Timeout,
            other @ (TransportError::Connect(_) | TransportError::Other(_)) => {
                UpstreamFailure::Transport(other.to_string())
            }
        };
        UpstreamError::new(api, endpoint.clone(), failure)
    })?;

    if response.is_success() {
        return Ok(response);
    }

    let failure = match response.status {
        403 | 429 => UpstreamFailure::RateLimited {
            status: response.status,
            authenticated: request.bearer.is_some(),
        },
        status => UpstreamFailure::status(status, &response.body),
    };
    Err(UpstreamError::new(api, endpoint, failure))
}

/// Decodes a JSON body into `T`, reporting missing or mistyped fields as
/// [`UpstreamFailure::InvalidBody`].
///
/// # Errors
///
/// Returns an [`UpstreamError`] when `body` does not match `T`.
pub fn decode_json<T: DeserializeOwned>(
    api: Api,
    endpoint: &str,
    body: &str,
) -> StdResult<T, UpstreamError> {
    serde_json::from_str(body)
        .map_err(|error| UpstreamError::invalid_body(api, endpoint, error.to_string()))
}
