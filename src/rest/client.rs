//! Request client shared by discovery, statements and label lookups.
//!
//! Wraps an [`HttpTransport`] with the protocol's default headers, a per-request
//! deadline, cancellation, status checking and JSON (de)serialization.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::endpoint::redact_url;
use super::error::{RestError, RestResult};
use super::message::ServerErrorBody;
use super::transport::{HttpRequest, HttpResponse, HttpTransport, Method};

/// JSON media type
pub const APPLICATION_JSON: &str = "application/json";

/// Request client.
///
/// Cloning is cheap; clones share the transport and, unless replaced with
/// [`RestClient::with_cancellation`], the cancellation token.
#[derive(Clone)]
pub struct RestClient {
    transport: Arc<dyn HttpTransport>,
    user_agent: String,
    stream: bool,
    timeout: Duration,
    cancel: CancellationToken,
}

impl RestClient {
    /// Create a client.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        user_agent: impl Into<String>,
        stream: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            user_agent: user_agent.into(),
            stream,
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Same client, different cancellation token.
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    /// Cancellation token observed by every request.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Request deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> RestResult<T> {
        let response = self.send(HttpRequest::new(Method::Get, url)).await?;
        decode_body(&response.body)
    }

    /// POST a JSON body and decode the JSON answer.
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> RestResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|e| RestError::transport(format!("cannot encode request body: {}", e)))?;
        let request = HttpRequest::new(Method::Post, url).with_body(Bytes::from(payload));
        let response = self.send(request).await?;
        decode_body(&response.body)
    }

    /// DELETE a resource, ignoring the body.
    pub async fn delete(&self, url: &str) -> RestResult<()> {
        self.send(HttpRequest::new(Method::Delete, url)).await?;
        Ok(())
    }

    /// Send a request with default headers, deadline and cancellation, and
    /// reject non-2xx answers.
    pub async fn send(&self, request: HttpRequest) -> RestResult<HttpResponse> {
        let request = self.with_default_headers(request);
        let method = request.method;
        let url = redact_url(&request.url);

        if self.cancel.is_cancelled() {
            return Err(RestError::Cancelled);
        }

        tracing::trace!(%method, %url, "sending request");

        // the transport Arc is captured here; swapping transports elsewhere
        // cannot affect this request
        let transport = Arc::clone(&self.transport);
        let response = tokio::select! {
            _ = self.cancel.cancelled() => return Err(RestError::Cancelled),
            result = tokio::time::timeout(self.timeout, transport.send(request)) => match result {
                Ok(response) => response?,
                Err(_) => return Err(RestError::Timeout),
            },
        };

        check_status(response)
    }

    fn with_default_headers(&self, mut request: HttpRequest) -> HttpRequest {
        let defaults = [
            ("X-Stream", if self.stream { "true" } else { "false" }),
            ("User-Agent", self.user_agent.as_str()),
            ("Accept", APPLICATION_JSON),
            ("Content-Type", APPLICATION_JSON),
        ];
        for (name, value) in defaults {
            if request.header(name).is_none() {
                request.headers.push((name.to_string(), value.to_string()));
            }
        }
        request
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("user_agent", &self.user_agent)
            .field("stream", &self.stream)
            .field("timeout", &self.timeout)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Map a non-2xx response to [`RestError::Status`], keeping the server's
/// message when the body carries one.
fn check_status(response: HttpResponse) -> RestResult<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }

    let text = match ServerErrorBody::parse(&response.body).and_then(|b| b.summary()) {
        Some(detail) => format!("{} ({})", response.status_text, detail),
        None => response.status_text.clone(),
    };
    Err(RestError::Status {
        code: response.status,
        text,
    })
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> RestResult<T> {
    serde_json::from_slice(body).map_err(RestError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use crate::rest::message::ServiceRoot;

    fn client(mock: &Arc<MockTransport>) -> RestClient {
        RestClient::new(mock.clone(), "test-agent/1.0", true, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_default_headers() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get("http://localhost:7474/", 200, r#"{"data": "http://localhost:7474/db/data/"}"#);

        let root: ServiceRoot = client(&mock).get_json("http://localhost:7474/").await.unwrap();
        assert_eq!(root.data_endpoint, "http://localhost:7474/db/data/");

        let sent = mock.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].header("X-Stream"), Some("true"));
        assert_eq!(sent[0].header("User-Agent"), Some("test-agent/1.0"));
        assert_eq!(sent[0].header("Accept"), Some("application/json"));
        assert_eq!(sent[0].header("Content-Type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get("http://localhost:7474/", 503, "");

        let err = client(&mock)
            .get_json::<ServiceRoot>("http://localhost:7474/")
            .await
            .unwrap_err();
        match err {
            RestError::Status { code, text } => {
                assert_eq!(code, 503);
                assert_eq!(text, "Service Unavailable");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_keeps_server_message() {
        let mock = Arc::new(MockTransport::new());
        mock.on_post(
            "http://localhost:7474/db/data/cypher",
            400,
            r#"{"message": "Invalid input 'x'", "exception": "SyntaxException"}"#,
        );

        let err = client(&mock)
            .post_json::<_, serde_json::Value>("http://localhost:7474/db/data/cypher", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("SyntaxException: Invalid input 'x'"));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get("http://localhost:7474/", 200, r#"{"management": "x"}"#);

        let err = client(&mock)
            .get_json::<ServiceRoot>("http://localhost:7474/")
            .await
            .unwrap_err();
        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Delete, "http://localhost:7474/", 200, "");

        let client = client(&mock);
        client.cancellation_token().cancel();
        let err = client.delete("http://localhost:7474/").await.unwrap_err();
        assert!(matches!(err, RestError::Cancelled));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let mock = Arc::new(MockTransport::new().with_delay(Duration::from_secs(60)));
        mock.on(Method::Delete, "http://localhost:7474/", 200, "");

        let err = client(&mock).delete("http://localhost:7474/").await;
        assert!(matches!(err, Err(RestError::Timeout)));
    }
}
