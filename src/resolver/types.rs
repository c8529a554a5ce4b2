use serde::{Deserialize, Serialize};

use super::errors::ResolutionError;
use crate::models::{BackendKind, StreamDescriptor};

/// Body of `GET /stream/{content_id}?source={provider}`.
///
/// Older deployments answer with `m3u8` instead of `stream_url` and carry the
/// delivery hint in `type`; both spellings are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub stream_url: Option<String>,
    #[serde(default)]
    pub m3u8: Option<String>,
    #[serde(default)]
    pub embed: Option<bool>,
    #[serde(default)]
    pub stream_type: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StreamResponse {
    /// Normalize into a descriptor. Only an explicit `success: true` is
    /// accepted; a body without the flag is malformed.
    pub fn into_descriptor(self) -> Result<StreamDescriptor, ResolutionError> {
        match self.success {
            Some(true) => {}
            Some(false) => {
                return Err(ResolutionError::Provider(
                    self.error.unwrap_or_else(|| "unknown error".to_string()),
                ));
            }
            None => {
                return Err(ResolutionError::Malformed(
                    "missing `success` field".to_string(),
                ));
            }
        }

        let url = self
            .stream_url
            .or(self.m3u8)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or(ResolutionError::NoPlayableStream)?;

        let hint = self
            .stream_type
            .as_deref()
            .or(self.kind.as_deref())
            .and_then(BackendKind::from_hint);

        let mut descriptor = StreamDescriptor::new(url);
        if let Some(hint) = hint {
            descriptor = descriptor.with_hint(hint);
        }
        if self.embed.unwrap_or(false) || hint == Some(BackendKind::DelegatedEmbed) {
            descriptor = descriptor.embedded();
        }

        Ok(descriptor)
    }
}

/// Body of `POST /report-broken-source`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokenSourceReport {
    pub imdb_id: String,
    pub source: String,
    #[serde(default)]
    pub note: String,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") || self.status.eq_ignore_ascii_case("ok")
    }
}
