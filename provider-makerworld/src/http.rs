//! HTTP Client Abstraction
//!
//! Provides async HTTP operations behind a trait seam so the catalog client
//! and downloader can be tested against mock transports. The production
//! implementation is a reqwest client with a shared cookie jar carrying the
//! platform session.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ProviderError, Result};

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Head,
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Parse response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ProviderError::Parse(format!("JSON deserialization failed: {}", e)))
    }

    /// Get response body as UTF-8 string, lossy on invalid bytes
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Content-Type header value, if present
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
    }
}

/// Async HTTP client trait
///
/// Implementations carry the platform session (cookies) and are shared
/// between the catalog client and the asset downloader.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Reqwest-backed client holding the MakerWorld session in a cookie jar.
///
/// The session cookies come from the host shell; this client never performs
/// a login flow of its own.
pub struct SessionHttpClient {
    client: reqwest::Client,
    jar: Arc<reqwest::cookie::Jar>,
    user_agent: String,
}

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/126.0.0.0 Safari/537.36";

impl SessionHttpClient {
    pub fn new() -> Result<Self> {
        let jar = Arc::new(reqwest::cookie::Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            jar,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    /// Install session cookies for a site.
    ///
    /// `cookies` is a `name=value; name2=value2` string as captured by the
    /// host shell's embedded browser.
    pub fn set_session_cookies(&self, site: &reqwest::Url, cookies: &str) {
        for cookie in cookies.split(';') {
            let cookie = cookie.trim();
            if !cookie.is_empty() {
                self.jar.add_cookie_str(cookie, site);
            }
        }
    }
}

#[async_trait]
impl HttpClient for SessionHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Head => self.client.head(&request.url),
        };

        builder = builder.header("User-Agent", &self.user_agent);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Transport(format!("Failed to read body: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
