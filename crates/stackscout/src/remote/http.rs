use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use stackscout_core::request::{Method, RemoteRequest};
use stackscout_core::ScoutError;

use super::{RawResponse, Transport};
use crate::config::Config;

/// reqwest transport against the configured base URL
pub struct HttpTransport {
    client: reqwest::Client,
    config: Config,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, ScoutError> {
        Ok(Self {
            client: create_authenticated_client(config)?,
            config: config.clone(),
        })
    }
}

/// Create an HTTP client with the bearer credential (when configured) and
/// JSON headers on every request
pub fn create_authenticated_client(config: &Config) -> Result<reqwest::Client, ScoutError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &config.api_key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| ScoutError::Configuration(format!("Invalid API key header: {e}")))?,
        );
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(concat!("stackscout/", env!("CARGO_PKG_VERSION")))
        .timeout(config.timeout)
        .build()
        .map_err(|e| ScoutError::Configuration(format!("Failed to build HTTP client: {e}")))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RemoteRequest) -> Result<RawResponse, ScoutError> {
        let url = self.config.url_for(&request.path);

        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ScoutError::Timeout {
                    operation: format!("{} {}", request.method, request.path),
                    after_ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                ScoutError::Upstream {
                    status: None,
                    message: format!("Request to {url} failed: {e}"),
                }
            }
        })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        let body = response.text().await.map_err(|e| ScoutError::Upstream {
            status: Some(status),
            message: format!("Failed to read response body: {e}"),
        })?;

        Ok(RawResponse {
            status,
            body,
            retry_after,
        })
    }
}
