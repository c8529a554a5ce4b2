use anyhow::{Context, Result};
use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::{debug, warn};
use url::Url;

use super::errors::ResolutionError;
use super::types::{BrokenSourceReport, HealthStatus, StreamResponse};
use crate::config::ResolverConfig;
use crate::models::{ContentId, ProviderName, StreamDescriptor};

/// Turns a (content, provider) pair into a playable stream descriptor.
///
/// Implementations issue exactly one request per call. Retry and failover
/// policy belongs to the playback session.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    async fn resolve(
        &self,
        content_id: &ContentId,
        provider: &ProviderName,
    ) -> Result<StreamDescriptor, ResolutionError>;
}

/// Resolver backed by the HTTP stream service
#[derive(Clone)]
pub struct HttpStreamResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStreamResolver {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .default_headers(standard_headers())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolver with default settings pointed at another service
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let config = ResolverConfig {
            base_url: base_url.into(),
            ..ResolverConfig::default()
        };
        Self::new(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Tell the service a provider handed out an unplayable stream
    pub async fn report_broken_source(
        &self,
        content_id: &ContentId,
        provider: &ProviderName,
        note: &str,
    ) -> Result<()> {
        let url = self.build_url("/report-broken-source");
        let report = BrokenSourceReport {
            imdb_id: content_id.to_string(),
            source: provider.to_string(),
            note: note.to_string(),
        };

        debug!("[report_broken_source] POST {} ({})", url, provider);

        let response = self
            .client
            .post(&url)
            .json(&report)
            .send()
            .await
            .context("Failed to send broken source report")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "[report_broken_source] Error response - Status: {}, Body: {}",
                status.as_u16(),
                body
            );
            anyhow::bail!("Broken source report rejected: HTTP {}", status.as_u16());
        }

        Ok(())
    }

    /// Service liveness. The health route sits at the host root, outside the
    /// API prefix.
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = Url::parse(&self.base_url)
            .and_then(|base| base.join("/health"))
            .context("Invalid resolver base URL")?;

        debug!("[health] GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Health check request failed")?
            .error_for_status()
            .context("Health check returned an error status")?;

        response
            .json::<HealthStatus>()
            .await
            .context("Failed to parse health response")
    }
}

#[async_trait]
impl StreamResolver for HttpStreamResolver {
    async fn resolve(
        &self,
        content_id: &ContentId,
        provider: &ProviderName,
    ) -> Result<StreamDescriptor, ResolutionError> {
        let encoded_id = utf8_percent_encode(content_id.as_str(), NON_ALPHANUMERIC).to_string();
        let url = self.build_url(&format!("/stream/{}", encoded_id));

        debug!("[resolve] GET {} (source: {})", url, provider);

        let response = self
            .client
            .get(&url)
            .query(&[("source", provider.as_str())])
            .send()
            .await
            .map_err(ResolutionError::from_reqwest)?;

        let status = response.status();
        debug!("[resolve] Response: {} (source: {})", status, provider);

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read response body>".to_string());

            warn!(
                "[resolve] Error response - Status: {}, Body: {}",
                status.as_u16(),
                body
            );

            // Failed lookups come back as 404 with a regular `success: false` body
            if let Ok(parsed) = serde_json::from_str::<StreamResponse>(&body)
                && parsed.success == Some(false)
            {
                return parsed.into_descriptor();
            }

            return Err(ResolutionError::from_status(status.as_u16(), body));
        }

        let body = response
            .text()
            .await
            .map_err(ResolutionError::from_reqwest)?;

        let parsed: StreamResponse = serde_json::from_str(&body).map_err(|e| {
            warn!("[resolve] Failed to parse response from {}: {}", provider, e);
            ResolutionError::Malformed(e.to_string())
        })?;

        parsed.into_descriptor()
    }
}

fn standard_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}
