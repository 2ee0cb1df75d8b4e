// src/transport/mod.rs
// Stateless JSON-over-HTTP executor used by every provider workflow

pub mod headers;

pub use headers::{authorization_value, parse_custom_headers, HeaderPlan, HeaderSet};

use crate::types::AssistError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

const ERROR_SNIPPET_CHARS: usize = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    /// GET with a JSON body, used by a few self-hosted backends
    Get,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HeaderSet,
    pub body: Value,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>, headers: HeaderSet, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers,
            body,
            timeout: None,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends one request and returns whatever status came back. Status
/// classification happens in [`classify`], so implementations only map
/// transport-level failures (`Timeout`, `Network`).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, AssistError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .build()
            .unwrap_or_default();

        Self { client }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, AssistError> {
        let body = serde_json::to_vec(&request.body)
            .map_err(|e| AssistError::InvalidConfig(format!("Unserializable body: {}", e)))?;

        let mut builder = match request.method {
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Get => self.client.get(&request.url),
        };
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.body(body).send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();

        tracing::debug!(
            "HTTP {} {} -> {} ({} bytes)",
            match request.method {
                HttpMethod::Post => "POST",
                HttpMethod::Get => "GET",
            },
            request.url,
            status,
            body.len()
        );

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> AssistError {
    if e.is_timeout() {
        AssistError::Timeout
    } else {
        AssistError::Network(e.to_string())
    }
}

/// Turns any status outside [200, 300) into `HttpError`
pub fn classify(response: HttpResponse) -> Result<HttpResponse, AssistError> {
    if response.is_success() {
        return Ok(response);
    }

    let message = extract_error_message(&response.body);
    tracing::warn!(
        "Provider returned HTTP {}: {}",
        response.status,
        message.as_deref().unwrap_or("<empty>")
    );
    Err(AssistError::http(response.status, message))
}

/// Probes the usual error fields of a JSON error body, then falls back to
/// the head of the raw text
pub fn extract_error_message(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        let paths: [&[&str]; 6] = [
            &["message"],
            &["error", "message"],
            &["error", "code"],
            &["code"],
            &["error_msg"],
            &["msg"],
        ];
        for path in paths {
            if let Some(message) = scalar_at(&value, path) {
                return Some(message);
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(ERROR_SNIPPET_CHARS).collect())
}

fn scalar_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    match current {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
