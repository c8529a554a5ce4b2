mod identifiers;

pub use identifiers::{ContentId, ProviderName, SessionId};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery mechanism behind a resolved stream URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Manifest-described stream with several encoded variants (HLS)
    AdaptiveBitrate,
    /// Single media file played directly by the video element
    ProgressiveFile,
    /// Third-party page mounted in a sandboxed frame
    DelegatedEmbed,
    Unknown,
}

impl BackendKind {
    /// Kind actually used for playback. `Unknown` renders as an embed.
    pub fn effective(self) -> Self {
        match self {
            BackendKind::Unknown => BackendKind::DelegatedEmbed,
            other => other,
        }
    }

    /// Parse the `type`/`stream_type` hint sent by the resolver service
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_lowercase().as_str() {
            "hls" | "m3u8" | "adaptive" => Some(BackendKind::AdaptiveBitrate),
            "mp4" | "progressive" | "file" => Some(BackendKind::ProgressiveFile),
            "iframe" | "embed" => Some(BackendKind::DelegatedEmbed),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::AdaptiveBitrate => "hls",
            BackendKind::ProgressiveFile => "mp4",
            BackendKind::DelegatedEmbed => "iframe",
            BackendKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalized answer of the resolver for one (content, provider) pair.
///
/// `url` is never empty for a descriptor handed out by a resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub url: String,
    pub backend_kind_hint: Option<BackendKind>,
    pub is_delegated_embed: bool,
}

impl StreamDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backend_kind_hint: None,
            is_delegated_embed: false,
        }
    }

    pub fn with_hint(mut self, hint: BackendKind) -> Self {
        self.backend_kind_hint = Some(hint);
        self
    }

    pub fn embedded(mut self) -> Self {
        self.is_delegated_embed = true;
        self
    }
}

/// One variant of an adaptive stream, indexed as the engine reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    pub index: usize,
    pub height: Option<u32>,
}

impl QualityLevel {
    pub fn label(&self) -> String {
        match self.height {
            Some(height) => format!("{}p", height),
            None => format!("Level {}", self.index + 1),
        }
    }
}

/// What the quality control asks the adaptive backend to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualitySelection {
    /// Let the engine's bandwidth heuristic choose
    Auto,
    /// Pin playback to the level with this engine index
    Level(usize),
}

/// Entry of the quality menu; `Auto` is always listed first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityEntry {
    Auto,
    Level(QualityLevel),
}

impl QualityEntry {
    pub fn label(&self) -> String {
        match self {
            QualityEntry::Auto => "Auto".to_string(),
            QualityEntry::Level(level) => level.label(),
        }
    }

    pub fn selection(&self) -> QualitySelection {
        match self {
            QualityEntry::Auto => QualitySelection::Auto,
            QualityEntry::Level(level) => QualitySelection::Level(level.index),
        }
    }
}

/// Why a provider was given up on during one exhaustion pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: ProviderName,
    pub reason: String,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.provider, self.reason)
    }
}
