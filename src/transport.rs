use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;

use crate::classify::FRAGMENT_CONTENT_TYPE;
use crate::error::{AutoCheckError, TransportError};
use crate::form::FormData;

/// Sends one validation request.
///
/// Implementations resolve with the response body on a 2xx status and with a
/// [`TransportError`] otherwise.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &str, body: &FormData) -> Result<String, TransportError>;
}

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Overall request timeout in seconds; `None` lets a request live until it
    /// settles or is superseded
    pub timeout_seconds: Option<u64>,
    /// User agent string
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            user_agent: format!("auto-check/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// reqwest-backed transport posting url-encoded forms
pub struct HttpTransport {
    client: Client,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self, AutoCheckError> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10);
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let client = builder.build().map_err(AutoCheckError::from)?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: &FormData) -> Result<String, TransportError> {
        let response = self
            .client
            .post(url)
            .header(ACCEPT, FRAGMENT_CONTENT_TYPE)
            .form(body.entries())
            .send()
            .await
            .map_err(|error| {
                tracing::debug!(url, %error, "validation request failed to complete");
                TransportError::network(error.status().map_or(0, |status| status.as_u16()))
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = match response.text().await {
            Ok(text) => text,
            Err(error) if status.is_success() => {
                tracing::debug!(url, %error, "failed to read validation response body");
                return Err(TransportError::network(status.as_u16()));
            }
            Err(_) => String::new(),
        };

        if status.is_success() {
            Ok(text)
        } else {
            Err(TransportError::status(status.as_u16(), text, content_type))
        }
    }
}
