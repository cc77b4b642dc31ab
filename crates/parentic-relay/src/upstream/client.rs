//! reqwest client for an OpenAI-compatible streaming completions endpoint.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderValue};
use tokio_stream::StreamExt;
use tracing::debug;

use parentic_core::config::UpstreamConfig;

use super::types::{ByteStream, CompletionRequest, UpstreamError, UpstreamReply, rejection_message};

/// Completion provider client. Cheap to clone.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl UpstreamClient {
    /// Create a client from configuration.
    ///
    /// Fails when no credential is configured, so a misconfigured relay is
    /// detected before any chat stream is opened.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let api_key = config
            .require_api_key()
            .map_err(|_| UpstreamError::MissingApiKey)?
            .to_string();

        // Ensure a TLS crypto provider is installed (reqwest uses rustls-no-provider).
        // The `Err` case just means it was already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            url: config.completions_url(),
            api_key,
        })
    }

    /// Endpoint this client posts to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue the streaming request.
    ///
    /// Returns `Err` only when no response arrives at all. A non-success
    /// status is a [`UpstreamReply::Rejected`] carrying whatever message the
    /// error body offers.
    pub async fn open(
        &self,
        request: &CompletionRequest,
    ) -> Result<UpstreamReply<ByteStream>, UpstreamError> {
        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        debug!(status = status.as_u16(), url = %self.url, "Completion provider responded");

        if !status.is_success() {
            let body = resp.bytes().await.unwrap_or_default();
            return Ok(UpstreamReply::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }

        let stream = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| UpstreamError::Transport(e.to_string())));
        Ok(UpstreamReply::Accepted(Box::pin(stream)))
    }
}
