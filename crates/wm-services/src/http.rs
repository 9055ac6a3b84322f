use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::{debug, warn};

use wm_core::{unresolved_markers, ChatService, Error, Message, Workspace, WorkspaceDirectory};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Backend speaking the WorkMate REST contract:
/// `POST {base}/chat` and `GET {base}/workspaces`.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

impl HttpBackend {
    pub fn new() -> Result<Self, Error> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Fails when the TLS backend cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn check_status(response: Response, what: &str) -> Result<Response, Error> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            format!("{} request failed", what)
        } else {
            format!("{} request failed: {}", what, body.trim())
        };
        Err(Error::api(status.as_u16(), message))
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::timeout(err.to_string())
    } else {
        Error::network(err.to_string())
    }
}

#[async_trait]
impl ChatService for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn send_chat_message(&self, text: &str) -> Result<Message, Error> {
        let url = self.endpoint("chat");
        debug!(%url, len = text.len(), "Sending chat message");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message: text })
            .send()
            .await
            .map_err(transport_error)?;
        let response = Self::check_status(response, "Chat").await?;

        let message: Message = response
            .json()
            .await
            .map_err(|e| Error::serialization(e.to_string()))?;

        let dangling = unresolved_markers(&message.content, &message.citations);
        if !dangling.is_empty() {
            warn!(id = %message.id, markers = ?dangling, "Reply references missing citations");
        }

        Ok(message)
    }
}

#[async_trait]
impl WorkspaceDirectory for HttpBackend {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, Error> {
        let url = self.endpoint("workspaces");
        debug!(%url, "Fetching workspaces");

        let response = self.client.get(&url).send().await.map_err(transport_error)?;
        let response = Self::check_status(response, "Workspaces").await?;

        response
            .json()
            .await
            .map_err(|e| Error::serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response and hand back the raw request.
    async fn serve_once(status_line: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}/api", addr), handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    #[test]
    fn test_endpoint_joining() {
        let backend = HttpBackend::new().unwrap().with_base_url("http://host/api/");
        assert_eq!(backend.endpoint("chat"), "http://host/api/chat");

        let backend = HttpBackend::new().unwrap();
        assert_eq!(backend.endpoint("workspaces"), "http://localhost:8000/api/workspaces");
    }

    #[test]
    fn test_with_timeout_builds_client() {
        let backend = HttpBackend::with_timeout(Duration::from_millis(250)).unwrap();
        assert_eq!(backend.base_url(), DEFAULT_BASE_URL);
    }

    #[tokio::test]
    async fn test_timeout_applies_to_requests() {
        // Accepts the connection but never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let backend = HttpBackend::with_timeout(Duration::from_millis(200))
            .unwrap()
            .with_base_url(format!("http://{}/api", addr));
        let err = backend.send_chat_message("hello").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "unexpected error: {err:?}");

        server.abort();
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(ChatRequest { message: "hi" }).unwrap();
        assert_eq!(body, serde_json::json!({ "message": "hi" }));
    }

    #[tokio::test]
    async fn test_send_chat_message_success() {
        let body = r#"{"id":"42","role":"assistant","content":"See [1]","citations":[{"number":1,"source":"Wiki","excerpt":"quote"}]}"#;
        let (base_url, server) = serve_once("200 OK", body).await;
        let backend = HttpBackend::new().unwrap().with_base_url(base_url);

        let message = backend.send_chat_message("What is in the wiki?").await.unwrap();

        assert_eq!(message.id, "42");
        assert!(message.is_assistant());
        assert_eq!(message.citation(1).unwrap().source, "Wiki");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/chat "));
        assert!(request.contains(r#"{"message":"What is in the wiki?"}"#));
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let (base_url, server) = serve_once("503 Service Unavailable", "").await;
        let backend = HttpBackend::new().unwrap().with_base_url(base_url);

        let err = backend.send_chat_message("hello").await.unwrap_err();

        assert!(matches!(err, Error::Api { status: 503, .. }));
        assert!(err.is_retryable());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_list_workspaces() {
        let body = r#"[{"id":"1","name":"Team Wiki","pageCount":89,"connected":true}]"#;
        let (base_url, server) = serve_once("200 OK", body).await;
        let backend = HttpBackend::new().unwrap().with_base_url(base_url);

        let workspaces = backend.list_workspaces().await.unwrap();

        assert_eq!(workspaces.len(), 1);
        assert_eq!(workspaces[0].page_count, 89);
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/workspaces "));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new().unwrap().with_base_url(format!("http://{}/api", addr));
        let err = backend.send_chat_message("hello").await.unwrap_err();

        assert!(matches!(err, Error::Network(_)));
    }
}
