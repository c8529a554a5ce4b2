use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub adaptive: AdaptiveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Base URL of the resolver service; stream, proxy and report paths hang off it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_proxy_path")]
    pub proxy_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Failover order. `auto` lets the resolver pick.
    #[serde(default = "default_providers")]
    pub providers: Vec<String>,

    #[serde(default = "default_retries")]
    pub max_retries: u32,

    #[serde(default = "default_embed_timeout")]
    pub embed_timeout_secs: u64,

    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// Tuning handed to the adaptive-bitrate engine on every manifest load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    #[serde(default = "default_true")]
    pub enable_worker: bool,

    #[serde(default)]
    pub low_latency_mode: bool,

    #[serde(default = "default_back_buffer")]
    pub back_buffer_length_secs: u32,

    #[serde(default = "default_max_buffer")]
    pub max_buffer_length_secs: u32,

    #[serde(default = "default_max_max_buffer")]
    pub max_max_buffer_length_secs: u32,

    #[serde(default = "default_true")]
    pub cap_level_to_player_size: bool,

    /// Sent as `Referer` on manifest and segment requests
    #[serde(default = "default_referer", skip_serializing_if = "Option::is_none")]
    pub request_referer: Option<String>,

    #[serde(default = "default_origin", skip_serializing_if = "Option::is_none")]
    pub request_origin: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config file found, using defaults");
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);
        let contents = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;
        info!("Config loaded successfully");
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents).context("Failed to write config file")?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.playback.providers.is_empty() {
            bail!("playback.providers must list at least one provider");
        }

        let mut seen = HashSet::new();
        for provider in &self.playback.providers {
            if provider.trim().is_empty() {
                bail!("playback.providers contains an empty provider name");
            }
            if !seen.insert(provider.to_lowercase()) {
                bail!("playback.providers lists '{}' more than once", provider);
            }
        }

        if self.resolver.request_timeout_secs == 0 {
            bail!("resolver.request_timeout_secs must be greater than zero");
        }
        if self.playback.embed_timeout_secs == 0 {
            bail!("playback.embed_timeout_secs must be greater than zero");
        }
        if self.playback.event_capacity == 0 {
            bail!("playback.event_capacity must be greater than zero");
        }

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("mirrorplay").join("config.toml"))
    }
}

impl ResolverConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PlaybackConfig {
    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_timeout(),
            proxy_path: default_proxy_path(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            max_retries: default_retries(),
            embed_timeout_secs: default_embed_timeout(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enable_worker: default_true(),
            low_latency_mode: false,
            back_buffer_length_secs: default_back_buffer(),
            max_buffer_length_secs: default_max_buffer(),
            max_max_buffer_length_secs: default_max_max_buffer(),
            cap_level_to_player_size: default_true(),
            request_referer: default_referer(),
            request_origin: default_origin(),
        }
    }
}

// Default value functions
fn default_base_url() -> String { "http://127.0.0.1:5000/api".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_proxy_path() -> String { "/proxy".to_string() }
fn default_providers() -> Vec<String> {
    ["auto", "vidsrc", "mixdrop", "streamwish", "doodstream"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}
fn default_retries() -> u32 { 3 }
fn default_embed_timeout() -> u64 { 15 }
fn default_event_capacity() -> usize { 256 }
fn default_true() -> bool { true }
fn default_back_buffer() -> u32 { 90 }
fn default_max_buffer() -> u32 { 30 }
fn default_max_max_buffer() -> u32 { 60 }
fn default_referer() -> Option<String> { Some("https://multiembed.mov/".to_string()) }
fn default_origin() -> Option<String> { Some("https://multiembed.mov".to_string()) }
