use core::fmt;
use core::result::Result as CoreResult;
use std::io::Error as IoError;
use std::path::PathBuf;

use csv::Error as CsvError;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Result type for ecosnap operations.
pub type Result<T> = CoreResult<T, Error>;

/// Maximum number of response-body characters kept in an error.
const BODY_EXCERPT_CHARS: usize = 200;

/// Errors that can abort a snapshot run.
#[derive(Debug, Error)]
pub enum Error {
    /// A call to one of the upstream APIs failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The snapshot file exists but does not match the expected schema.
    #[error("corrupt snapshot store {}: {detail}", .path.display())]
    CorruptStore {
        /// Path of the offending file.
        path: PathBuf,
        /// What did not match.
        detail: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// Writing a CSV row failed.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),
}

impl Error {
    /// Returns `true` when the run failed because an API rate-limited us.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Upstream(upstream) if upstream.is_rate_limited())
    }

    /// Returns `true` for [`Error::CorruptStore`].
    pub fn is_corrupt_store(&self) -> bool {
        matches!(self, Self::CorruptStore { .. })
    }
}

/// The external API a request was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Api {
    /// The code-hosting API (`api.github.com`).
    GitHub,
    /// The dataset-hosting API (`huggingface.co/api`).
    HuggingFace,
}

impl Api {
    /// Name of the environment variable holding this API's token.
    pub fn token_env_var(self) -> &'static str {
        match self {
            Self::GitHub => "GITHUB_TOKEN",
            Self::HuggingFace => "HF_TOKEN",
        }
    }
}

impl fmt::Display for Api {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::GitHub => "GitHub",
            Self::HuggingFace => "Hugging Face",
        })
    }
}

/// A failed request against one of the upstream APIs.
#[derive(Debug, Error)]
#[error("{api} request to {endpoint} failed: {failure}")]
pub struct UpstreamError {
    /// Which API was called.
    pub api: Api,
    /// The URL that was requested.
    pub endpoint: String,
    /// What went wrong.
    pub failure: UpstreamFailure,
}

impl UpstreamError {
    /// Creates a new upstream error.
    pub fn new(api: Api, endpoint: impl Into<String>, failure: UpstreamFailure) -> Self {
        Self {
            api,
            endpoint: endpoint.into(),
            failure,
        }
    }

    /// Creates an error for a body that could not be decoded.
    pub fn invalid_body(api: Api, endpoint: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(
            api,
            endpoint,
            UpstreamFailure::InvalidBody {
                detail: detail.into(),
            },
        )
    }

    /// Returns `true` when the API answered 403 or 429.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.failure, UpstreamFailure::RateLimited { .. })
    }

    /// HTTP status of the failing response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self.failure {
            UpstreamFailure::RateLimited { status, .. } | UpstreamFailure::Status { status, .. } => {
                Some(status)
            }
            _ => None,
        }
    }
}

/// Failure categories for upstream requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamFailure {
    /// The API refused the request with 403 or 429.
    RateLimited {
        /// HTTP status code.
        status: u16,
        /// Whether a bearer token was attached.
        authenticated: bool,
    },
    /// Any other non-success status.
    Status {
        /// HTTP status code.
        status: u16,
        /// Leading part of the response body.
        body: String,
    },
    /// The request did not complete within the configured timeout.
    Timeout,
    /// Connection or protocol failure before a status was received.
    Transport(String),
    /// The body was not valid JSON or lacked an expected field.
    InvalidBody {
        /// Decoder message.
        detail: String,
    },
    /// Pagination reached the configured page bound.
    PaginationLimit {
        /// Pages fetched before giving up.
        pages: usize,
    },
    /// A next-page link pointed back at an already fetched page.
    PaginationLoop {
        /// The repeated link.
        url: String,
    },
}

impl UpstreamFailure {
    /// Builds a [`UpstreamFailure::Status`] keeping only the start of `body`.
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: body.chars().take(BODY_EXCERPT_CHARS).collect(),
        }
    }
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited {
                status,
                authenticated: true,
            } => write!(formatter, "rate limited (HTTP {status}) despite a token"),
            Self::RateLimited {
                status,
                authenticated: false,
            } => write!(
                formatter,
                "rate limited (HTTP {status}); provide an API token to raise the limit"
            ),
            Self::Status { status, body } => write!(formatter, "HTTP {status}: {body}"),
            Self::Timeout => formatter.write_str("request timed out"),
            Self::Transport(message) => write!(formatter, "transport error: {message}"),
            Self::InvalidBody { detail } => write!(formatter, "unexpected response body: {detail}"),
            Self::PaginationLimit { pages } => {
                write!(formatter, "pagination did not terminate after {pages} pages")
            }
            Self::PaginationLoop { url } => write!(formatter, "pagination revisited {url}"),
        }
    }
}
