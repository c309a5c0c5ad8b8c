//! HTTP client for the ceton-proxy stream API.

use std::time::Duration;

use log::debug;
use thiserror::Error;

use ceton_protocol::{ApiErrorBody, StreamGrant, StreamRequestBody};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },
}

impl ClientError {
    /// True when the server had no free tuner.
    pub fn is_no_tuner(&self) -> bool {
        matches!(self, ClientError::Status { status: 503, .. })
    }
}

/// Client connection configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `http://127.0.0.1:5004`.
    pub server: String,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: "http://127.0.0.1:5004".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamClient {
    client: reqwest::Client,
    base: String,
}

impl StreamClient {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base: config.server.trim_end_matches('/').to_string(),
        })
    }

    /// Request a stream of `channel`.
    pub async fn allocate(&self, channel: u32, job: usize) -> Result<StreamGrant, ClientError> {
        let url = format!("{}/api/stream", self.base);
        let body = StreamRequestBody {
            channel,
            context: Some(serde_json::json!({ "origin": "ceton-loadgen", "job": job })),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        let response = check_status(&url, response).await?;

        let grant: StreamGrant = response
            .json()
            .await
            .map_err(|source| ClientError::Transport { url, source })?;
        debug!("Job {} got tuner {} at {}", job, grant.tuner, grant.locator);
        Ok(grant)
    }

    /// Release a previously allocated tuner.
    pub async fn release(&self, tuner: usize) -> Result<(), ClientError> {
        let url = format!("{}/api/stream/{}", self.base, tuner);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        check_status(&url, response).await?;
        Ok(())
    }
}

async fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ApiErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
    };
    Err(ClientError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        message,
    })
}
