//! Metrics collection against the GitHub and Hugging Face APIs.
//!
//! Every request goes through the [`HttpTransport`] seam so the clients can be
//! driven by [`MockTransport`] in tests. Collection is sequential and blocking.

/// Snapshot assembly.
pub mod collector;
/// GitHub repository and search endpoints.
pub mod github;
/// Hugging Face dataset listing.
pub mod huggingface;
/// `Link` header parsing.
pub mod link;
/// Scripted transport for tests.
pub mod mock;
/// HTTP transport abstraction and the reqwest implementation.
pub mod transport;

pub use collector::{Clock, FixedClock, MetricsCollector, SystemClock};
pub use github::GitHubClient;
pub use huggingface::{HuggingFaceClient, owner_of};
pub use mock::MockTransport;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
