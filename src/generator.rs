//! Remote SQL generator clients.
//!
//! A generator endpoint receives `{"database": ..., "query": ...}` and answers
//! with generated SQL. The endpoint is treated as an untrusted black box:
//! any response shape is tolerated and turned into SQL text on a best-effort
//! basis.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::error::{BenchError, Result};

/// Request body sent to a generator endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    pub database: String,
    pub query: String,
}

impl GenerateRequest {
    /// Creates a request for `question` against `database`.
    pub fn new(database: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            query: question.into(),
        }
    }
}

/// Failure of a single generator call. Recorded on the instance result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The endpoint answered with a non-success status.
    #[error("Error: {status} - {body}")]
    Status { status: u16, body: String },

    /// The call exceeded its deadline.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The request could not be sent or the body could not be read.
    #[error("{0}")]
    Transport(String),
}

/// Trait for clients that turn a question into SQL.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Asks the generator for SQL answering `request`.
    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> std::result::Result<String, GenerationError>;
}

/// HTTP generator client posting JSON to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    endpoint_url: String,
    timeout: Duration,
    client: Client,
}

impl HttpGenerator {
    /// Creates a client for `endpoint_url` with a per-call timeout.
    pub fn new(endpoint_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BenchError::generator(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            endpoint_url: endpoint_url.into(),
            timeout,
            client,
        })
    }
}

#[async_trait]
impl SqlGenerator for HttpGenerator {
    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> std::result::Result<String, GenerationError> {
        let response = self
            .client
            .post(&self.endpoint_url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.timeout.as_secs())
                } else {
                    GenerationError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.timeout.as_secs())
            } else {
                GenerationError::Transport(format!("Failed to read response: {e}"))
            }
        })?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(database = %request.database, bytes = body.len(), "Generator responded");
        Ok(parse_generator_body(&body))
    }
}

/// Extracts SQL text from a generator response body.
///
/// Accepts a JSON object exposing `sql` or `generated_sql`. Any other JSON is
/// stringified whole, and a body that is not JSON is used verbatim.
pub fn parse_generator_body(body: &str) -> String {
    match serde_json::from_str::<JsonValue>(body) {
        Ok(JsonValue::Object(map)) => ["sql", "generated_sql"]
            .iter()
            .find_map(|key| map.get(*key).and_then(truthy_text))
            .unwrap_or_else(|| JsonValue::Object(map).to_string()),
        Ok(JsonValue::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => body.to_string(),
    }
}

/// Returns the text of a field if it carries a usable value.
fn truthy_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null | JsonValue::Bool(false) => None,
        JsonValue::String(s) if s.is_empty() => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Array(a) if a.is_empty() => None,
        JsonValue::Object(o) if o.is_empty() => None,
        JsonValue::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// Mock generator that answers from a table keyed by question.
///
/// Unknown questions fail with a 404 status.
#[derive(Debug, Default)]
pub struct MockGenerator {
    responses: HashMap<String, std::result::Result<String, GenerationError>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl MockGenerator {
    /// Creates a mock generator with no canned answers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `question` with `sql`.
    pub fn with_sql(mut self, question: impl Into<String>, sql: impl Into<String>) -> Self {
        self.responses.insert(question.into(), Ok(sql.into()));
        self
    }

    /// Answers `question` with a generation failure.
    pub fn with_error(mut self, question: impl Into<String>, error: GenerationError) -> Self {
        self.responses.insert(question.into(), Err(error));
        self
    }

    /// Returns every request received so far, in order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SqlGenerator for MockGenerator {
    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> std::result::Result<String, GenerationError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        self.responses
            .get(&request.query)
            .cloned()
            .unwrap_or_else(|| {
                Err(GenerationError::Status {
                    status: 404,
                    body: "Not Found".to_string(),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_sql_field() {
        assert_eq!(parse_generator_body(r#"{"sql": "SELECT 1;"}"#), "SELECT 1;");
    }

    #[test]
    fn test_parse_generated_sql_field() {
        assert_eq!(
            parse_generator_body(r#"{"generated_sql": "SELECT 2;", "model": "x"}"#),
            "SELECT 2;"
        );
    }

    #[test]
    fn test_parse_empty_sql_falls_through() {
        assert_eq!(
            parse_generator_body(r#"{"sql": "", "generated_sql": "SELECT 3;"}"#),
            "SELECT 3;"
        );
    }

    #[test]
    fn test_parse_object_without_known_keys() {
        assert_eq!(
            parse_generator_body(r#"{"query": "SELECT 4;"}"#),
            r#"{"query":"SELECT 4;"}"#
        );
    }

    #[test]
    fn test_parse_json_string_and_array() {
        assert_eq!(parse_generator_body(r#""SELECT 5;""#), "SELECT 5;");
        assert_eq!(parse_generator_body(r#"["SELECT 6;"]"#), r#"["SELECT 6;"]"#);
    }

    #[test]
    fn test_parse_non_json_body() {
        assert_eq!(parse_generator_body("SELECT 7;"), "SELECT 7;");
    }

    #[test]
    fn test_status_error_display() {
        let err = GenerationError::Status {
            status: 500,
            body: "Internal Server Error".to_string(),
        };
        assert_eq!(err.to_string(), "Error: 500 - Internal Server Error");
    }

    #[tokio::test]
    async fn test_mock_generator() {
        let generator = MockGenerator::new().with_sql("How many?", "SELECT COUNT(*) FROM t");
        let request = GenerateRequest::new("bench", "How many?");

        assert_eq!(
            generator.generate(&request).await.unwrap(),
            "SELECT COUNT(*) FROM t"
        );
        assert!(generator
            .generate(&GenerateRequest::new("bench", "Unknown"))
            .await
            .is_err());
        assert_eq!(generator.requests().len(), 2);
    }

    /// Serves exactly one HTTP response and returns the raw request it saw.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            l.to_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (url, handle)
    }

    #[tokio::test]
    async fn test_http_generator_success() {
        let (url, server) = serve_once("200 OK", r#"{"sql": "SELECT 1;"}"#).await;
        let generator = HttpGenerator::new(url, Duration::from_secs(5)).unwrap();

        let sql = generator
            .generate(&GenerateRequest::new("solar_panel", "How many panels?"))
            .await
            .unwrap();
        assert_eq!(sql, "SELECT 1;");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST / HTTP/1.1"));
        assert!(request.contains(r#"{"database":"solar_panel","query":"How many panels?"}"#));
    }

    #[tokio::test]
    async fn test_http_generator_error_status() {
        let (url, server) =
            serve_once("500 Internal Server Error", "model crashed").await;
        let generator = HttpGenerator::new(url, Duration::from_secs(5)).unwrap();

        let err = generator
            .generate(&GenerateRequest::new("solar_panel", "How many panels?"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GenerationError::Status {
                status: 500,
                body: "model crashed".to_string()
            }
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_generator_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let generator = HttpGenerator::new(url, Duration::from_secs(5)).unwrap();
        let err = generator
            .generate(&GenerateRequest::new("solar_panel", "q"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Transport(_)));
    }
}
