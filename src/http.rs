//! HTTP transport seam.
//!
//! Every network-backed adapter talks through `HttpClient`, so the same
//! adapters run against `reqwest` in production and against canned responses
//! in tests.

use crate::errors::{FootprintError, FootprintResult};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Browser-like agent; several platforms serve a stripped page to unknown agents
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub json: Option<Value>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            json: None,
            timeout: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            json: Some(body),
            ..Self::get(url)
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Network-level failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request deadline elapsed
    #[error("timeout")]
    Timeout,
    /// Connect, TLS, protocol or read failure
    #[error("{0}")]
    Failed(String),
}

impl TransportError {
    fn from_reqwest(context: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Failed(format!("{}{}", context, e))
        }
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production client backed by `reqwest`
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> FootprintResult<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FootprintError::HttpClient(e.to_string()))?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.inner.get(&request.url),
            Method::Post => self.inner.post(&request.url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            log::trace!("Request to {} failed: {}", request.url, e);
            TransportError::from_reqwest("", e)
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest("failed to read body: ", e))?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Canned-response client for adapter and engine tests.

    use super::*;
    use std::sync::Mutex;

    type Route = (String, Result<HttpResponse, TransportError>);

    /// Answers requests whose URL starts with a registered prefix.
    /// Longest matching prefix wins, later registrations break ties;
    /// unmatched URLs get a 404.
    #[derive(Default)]
    pub struct FakeHttpClient {
        routes: Vec<Route>,
        pub seen: Mutex<Vec<HttpRequest>>,
    }

    impl FakeHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(mut self, prefix: &str, status: u16, body: &str) -> Self {
            self.routes.push((
                prefix.to_string(),
                Ok(HttpResponse {
                    status,
                    body: body.to_string(),
                }),
            ));
            self
        }

        pub fn fail(mut self, prefix: &str, message: &str) -> Self {
            self.routes
                .push((prefix.to_string(), Err(TransportError::Failed(message.to_string()))));
            self
        }

        pub fn time_out(mut self, prefix: &str) -> Self {
            self.routes.push((prefix.to_string(), Err(TransportError::Timeout)));
            self
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for FakeHttpClient {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let url = request.url.clone();
            self.seen.lock().unwrap().push(request);
            self.routes
                .iter()
                .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, outcome)| outcome.clone())
                .unwrap_or_else(|| {
                    Ok(HttpResponse {
                        status: 404,
                        body: "Page not found".to_string(),
                    })
                })
        }
    }
}
