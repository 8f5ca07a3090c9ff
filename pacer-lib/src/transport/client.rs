use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use reqwest::{IntoUrl, Request, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::Transport;
use crate::{ErrorKind, Result};

/// Default timeout of a single HTTP request in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("pacer/", env!("CARGO_PKG_VERSION"));

/// Settings for the HTTP client behind an [`HttpTransport`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Timeout of a single request
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Headers sent with every request
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_headers")]
    #[serde(serialize_with = "serialize_headers")]
    pub headers: HeaderMap,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            headers: HeaderMap::new(),
        }
    }
}

const fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl HttpConfig {
    /// Add a header sent with every request, replacing an earlier value
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidHeader`] if name or value are not valid
    /// HTTP header syntax.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.trim().as_bytes())?;
        let value = HeaderValue::from_str(value.trim())?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

/// Custom deserializer for headers from TOML config format
fn deserialize_headers<'de, D>(deserializer: D) -> std::result::Result<HeaderMap, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let map = HashMap::<String, String>::deserialize(deserializer)?;
    let mut header_map = HeaderMap::new();

    for (name, value) in map {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| serde::de::Error::custom(format!("Invalid header name '{name}': {e}")))?;
        let header_value = HeaderValue::from_str(&value).map_err(|e| {
            serde::de::Error::custom(format!("Invalid header value '{value}': {e}"))
        })?;
        header_map.insert(header_name, header_value);
    }

    Ok(header_map)
}

/// Custom serializer for headers to TOML config format
fn serialize_headers<S>(headers: &HeaderMap, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let map: HashMap<String, String> = headers
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_str().unwrap_or("").to_string()))
        .collect();
    map.serialize(serializer)
}

/// Executes [`reqwest::Request`]s with a shared [`reqwest::Client`].
///
/// Cloning is cheap; clones share the client's connection pool. Keep a
/// clone around to build the requests that are submitted to the dispatcher.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Wrap an already configured client
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a client from the given settings
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::BuildClient`] if the TLS backend cannot be
    /// initialized or the user agent is not a valid header value.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(config.headers.clone())
            .build()
            .map_err(ErrorKind::BuildClient)?;
        Ok(Self::new(client))
    }

    /// Start building a request with this transport's client
    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// The underlying HTTP client
    #[must_use]
    pub const fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    type Request = Request;
    type Response = Response;

    async fn execute(&self, request: Request) -> Result<Response> {
        self.client
            .execute(request)
            .await
            .map_err(ErrorKind::NetworkRequest)
    }
}
