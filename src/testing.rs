//! Scripted transport for unit tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::rest::{HttpRequest, HttpResponse, HttpTransport, Method, RestError, RestResult};

/// Transport answering from a script and recording every request.
///
/// Each (method, URL) route holds a queue of responses; the last one is
/// repeated once the queue is down to a single entry.
#[derive(Default)]
pub(crate) struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn on(&self, method: Method, url: &str, status: u16, body: &str) {
        let response = HttpResponse::new(status, reason(status), body.to_string());
        self.routes
            .lock()
            .entry((method, url.to_string()))
            .or_default()
            .push_back(response);
    }

    pub(crate) fn on_get(&self, url: &str, status: u16, body: &str) {
        self.on(Method::Get, url, status, body);
    }

    pub(crate) fn on_post(&self, url: &str, status: u16, body: &str) {
        self.on(Method::Post, url, status, body);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Requests sent with `method` to `url`.
    pub(crate) fn count(&self, method: Method, url: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    /// Parsed JSON bodies of the POSTs sent to `url`, in order.
    pub(crate) fn posted_bodies(&self, url: &str) -> Vec<serde_json::Value> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == Method::Post && r.url == url)
            .filter_map(|r| r.body.as_ref())
            .filter_map(|b| serde_json::from_slice(b).ok())
            .collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> RestResult<HttpResponse> {
        let key = (request.method, request.url.clone());
        self.requests.lock().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut routes = self.routes.lock();
        let queue = routes
            .get_mut(&key)
            .ok_or_else(|| RestError::transport(format!("connection refused: {} {}", key.0, key.1)))?;
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.ok_or_else(|| RestError::transport("empty route"))
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}
