//! Remote tool endpoints
//!
//! A `RemoteEndpoint` is the connection descriptor of a remote tool: URL,
//! auth headers and timeout. It is resolved into a `RemoteClient` once, when
//! the registry is built, never per call.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::core::{Result, RoundtableError};
use crate::tools::traits::Tool;

fn default_timeout_secs() -> u64 {
    60
}

/// Connection descriptor for a remote tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEndpoint {
    /// Full URL of the endpoint
    pub url: String,
    /// Literal headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Headers whose values are read from environment variables (header -> var)
    #[serde(default)]
    pub header_env: BTreeMap<String, String>,
    /// Environment variable holding a bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_env: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RemoteEndpoint {
    /// Create a descriptor for a URL with default timeout and no headers
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            header_env: BTreeMap::new(),
            bearer_env: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Add a literal header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the timeout
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Validate the descriptor and build its HTTP client
    pub fn connect(&self) -> Result<RemoteClient> {
        RemoteClient::new(
            self.parse_url()?,
            self.resolve_headers()?,
            Duration::from_secs(self.timeout_secs),
        )
    }

    /// Parse the endpoint URL
    pub fn parse_url(&self) -> Result<Url> {
        Url::parse(&self.url).map_err(|e| {
            RoundtableError::config(format!("Invalid endpoint URL '{}': {}", self.url, e))
        })
    }

    /// Literal headers plus those read from the environment
    pub fn resolve_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            insert_header(&mut headers, name, value)?;
        }
        for (name, var) in &self.header_env {
            let value = read_env(var, &self.url)?;
            insert_header(&mut headers, name, &value)?;
        }
        if let Some(var) = &self.bearer_env {
            let token = read_env(var, &self.url)?;
            insert_header(&mut headers, AUTHORIZATION.as_str(), &format!("Bearer {}", token))?;
        }
        Ok(headers)
    }
}

pub(crate) fn read_env(var: &str, owner: &str) -> Result<String> {
    let value = std::env::var(var).map_err(|_| {
        RoundtableError::config(format!(
            "'{}' requires environment variable '{}' but it is missing",
            owner, var
        ))
    })?;
    if value.trim().is_empty() {
        return Err(RoundtableError::config(format!(
            "'{}' has an empty value in '{}'",
            owner, var
        )));
    }
    Ok(value)
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| RoundtableError::config(format!("Invalid header name '{}': {}", name, e)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| RoundtableError::config(format!("Invalid value for header '{}': {}", name, e)))?;
    headers.insert(name, value);
    Ok(())
}

/// A resolved endpoint with its own HTTP client
#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: Client,
    url: Url,
}

impl RemoteClient {
    /// Build a client for the given URL and default headers
    pub fn new(url: Url, headers: HeaderMap, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, url })
    }

    /// Endpoint URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// GET with query parameters and return the response text
    pub async fn get(&self, query: &[(&str, &str)]) -> Result<String> {
        debug!(url = %self.url, "GET remote tool");
        let response = self.client.get(self.url.clone()).query(query).send().await?;
        self.read_body(response).await
    }

    /// POST a JSON body and return the response text
    pub async fn post_json(&self, body: &Value) -> Result<String> {
        debug!(url = %self.url, "POST remote tool");
        let response = self.client.post(self.url.clone()).json(body).send().await?;
        self.read_body(response).await
    }

    /// Non-success status codes are errors carrying the status and body
    async fn read_body(&self, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RoundtableError::other(format!(
                "HTTP {} from {}: {}",
                status, self.url, text
            )));
        }

        Ok(text)
    }
}

/// Generic tool that posts its arguments to a remote endpoint
pub struct HttpTool {
    name: String,
    description: String,
    parameters: Value,
    remote: RemoteClient,
}

impl HttpTool {
    /// Create a tool for a resolved endpoint
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Option<Value>,
        remote: RemoteClient,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: parameters
                .unwrap_or_else(|| serde_json::json!({ "type": "object", "properties": {} })),
            remote,
        }
    }
}

#[async_trait]
impl Tool for HttpTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn invoke(&self, arguments: Value) -> Result<String> {
        self.remote.post_json(&arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_config_error() {
        let err = RemoteEndpoint::new("not a url").connect().unwrap_err();
        assert!(matches!(err, RoundtableError::Config(_)));
    }

    #[test]
    fn test_missing_env_header_is_config_error() {
        let mut endpoint = RemoteEndpoint::new("https://example.com/search");
        endpoint
            .header_env
            .insert("api_key".into(), "ROUNDTABLE_TEST_UNSET_VAR".into());
        let err = endpoint.connect().unwrap_err();
        assert!(err.to_string().contains("ROUNDTABLE_TEST_UNSET_VAR"));
    }

    #[test]
    fn test_connect_with_literal_headers() {
        let client = RemoteEndpoint::new("https://example.com/search")
            .header("Content-Type", "application/json")
            .timeout_secs(5)
            .connect()
            .unwrap();
        assert_eq!(client.url().path(), "/search");
    }
}
