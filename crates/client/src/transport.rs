use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Method, StatusCode, Url,
    header::{self, HeaderMap, HeaderValue},
};
use serde_json::Value;

/// One call against the remote service. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

/// A descriptor plus the headers the client decided to attach.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub descriptor: RequestDescriptor,
    pub headers: HeaderMap,
}

impl OutboundRequest {
    pub fn new(descriptor: RequestDescriptor, headers: HeaderMap) -> Self {
        Self {
            descriptor,
            headers,
        }
    }

    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: StatusCode, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }
}

/// Failure before any response reached the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("server unreachable: {0}")]
    Unreachable(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("no transport available: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::Timeout(value.to_string())
        } else if value.is_builder() {
            Self::InvalidRequest(value.to_string())
        } else {
            Self::Unreachable(value.to_string())
        }
    }
}

/// Moves one request over the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError>;

    /// Whether a request could be dispatched at all right now.
    fn ensure_ready(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base_url: String,
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::build(base_url, reqwest::Client::builder())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        Self::build(base_url, reqwest::Client::builder().timeout(timeout))
    }

    fn build(base_url: &str, builder: reqwest::ClientBuilder) -> Result<Self, TransportError> {
        Url::parse(base_url)
            .map_err(|err| TransportError::InvalidRequest(format!("invalid base_url: {err}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let http = builder
            .default_headers(headers)
            .build()
            .map_err(|err| {
                TransportError::Unavailable(format!("failed to build http client: {err}"))
            })?;

        Ok(Self {
            base_url: base_url.to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        let OutboundRequest {
            descriptor,
            headers,
        } = request;

        let mut req = self
            .http
            .request(descriptor.method().clone(), self.url(descriptor.path()))
            .headers(headers);
        if !descriptor.query().is_empty() {
            req = req.query(descriptor.query());
        }
        if let Some(body) = descriptor.body() {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        Ok(RawResponse::new(status, body.to_vec()))
    }
}
