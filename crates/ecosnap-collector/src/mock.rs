//! Scripted transport for testing collectors without network access.
//!
//! Replies are keyed by [`HttpRequest::full_url`]. Each URL serves its
//! scripted replies in order; the last reply repeats once the queue is down
//! to one, so the same script can drive several runs. Unknown URLs answer 404.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Reply script storage type
type ReplyMap = HashMap<String, VecDeque<Result<HttpResponse, TransportError>>>;

/// Transport that answers from a script and records every request.
#[derive(Default)]
pub struct MockTransport {
    /// Scripted replies keyed by full URL
    replies: Mutex<ReplyMap>,
    /// Requests in the order they were made
    history: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    /// Creates an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `url`.
    #[must_use]
    pub fn with_response(self, url: impl Into<String>, response: HttpResponse) -> Self {
        self.push(url.into(), Ok(response));
        self
    }

    /// Queues a response with the given status and body.
    #[must_use]
    pub fn with_json(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.with_response(url, HttpResponse::new(status, body))
    }

    /// Queues a 200 page whose `Link` header points at `next`.
    #[must_use]
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>, next: Option<&str>) -> Self {
        let response = HttpResponse::new(200, body);
        let response = match next {
            Some(link) => response.with_next_link(link),
            None => response,
        };
        self.with_response(url, response)
    }

    /// Queues a transport failure for `url`.
    #[must_use]
    pub fn with_failure(self, url: impl Into<String>, error: TransportError) -> Self {
        self.push(url.into(), Err(error));
        self
    }

    /// Every request made so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.recorded().clone()
    }

    /// Number of requests made so far.
    pub fn call_count(&self) -> usize {
        self.recorded().len()
    }

    /// Number of requests made to `url`.
    pub fn calls_to(&self, url: &str) -> usize {
        self.recorded()
            .iter()
            .filter(|request| request.full_url() == url)
            .count()
    }

    /// Clears the request history.
    pub fn clear_history(&self) {
        self.recorded().clear();
    }

    fn recorded(&self) -> MutexGuard<'_, Vec<HttpRequest>> {
        // A panicking test thread leaves the history intact.
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, url: String, reply: Result<HttpResponse, TransportError>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(url)
            .or_default()
            .push_back(reply);
    }
}

impl HttpTransport for MockTransport {
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.recorded().push(request.clone());

        let url = request.full_url();
        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        let reply = match replies.get_mut(&url) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        drop(replies);

        reply.unwrap_or_else(|| Ok(HttpResponse::new(404, format!("no mock reply for {url}"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_replies_in_order_then_repeat_last() {
        let transport = MockTransport::new()
            .with_json("https://api.test/x", 500, "first")
            .with_json("https://api.test/x", 200, "second");
        let request = HttpRequest::get("https://api.test/x");

        let bodies: Vec<String> = (0..3)
            .map(|_| match transport.get(&request) {
                Ok(response) => response.body,
                Err(error) => panic!("unexpected failure: {error}"),
            })
            .collect();
        assert_eq!(bodies, ["first", "second", "second"]);
        assert_eq!(transport.calls_to("https://api.test/x"), 3);
    }

    #[test]
    fn test_unknown_url_is_404() {
        let transport = MockTransport::new();
        let response = transport
            .get(&HttpRequest::get("https://api.test/missing"))
            .unwrap_or_else(|err| panic!("mock should answer: {err}"));
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_routes_include_query() {
        let transport = MockTransport::new().with_json("https://api.test/s?q=a", 200, "a");
        let request = HttpRequest::get("https://api.test/s").query("q", "a");
        let response = transport
            .get(&request)
            .unwrap_or_else(|err| panic!("mock should answer: {err}"));
        assert_eq!(response.body, "a");
    }

    #[test]
    fn test_history_can_be_cleared() {
        let transport = MockTransport::new();
        let request = HttpRequest::get("https://api.test/anything");
        assert!(transport.get(&request).is_ok());
        assert_eq!(transport.call_count(), 1);
        transport.clear_history();
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_history_survives_poisoned_lock() {
        let transport = Arc::new(MockTransport::new());
        let request = HttpRequest::get("https://api.test/anything");
        assert!(transport.get(&request).is_ok());

        let poisoner = Arc::clone(&transport);
        let outcome = thread::spawn(move || {
            let _guard = poisoner.recorded();
            panic!("poison the history lock");
        })
        .join();
        assert!(outcome.is_err());
        assert!(transport.history.is_poisoned());

        assert!(transport.get(&request).is_ok());
        assert_eq!(transport.call_count(), 2);
    }
}
