//! Application configuration for currichef.
//!
//! User config lives at `~/.currichef/currichef.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ChefError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "currichef.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".currichef";

// ---------------------------------------------------------------------------
// Config structs (matching currichef.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Channel identity and source site.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Scrape-phase policies.
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Discovery-phase policies.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// `[channel]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Base URL of the curriculum site. Used to decide when a linked
    /// resource is owned by the site.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Source hostname reported in the channel root.
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Channel language: "en" or "es".
    #[serde(default = "default_language")]
    pub language: String,

    /// Channel thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            hostname: default_hostname(),
            language: default_language(),
            thumbnail: None,
        }
    }
}

fn default_base_url() -> String {
    "https://www.teachengineering.org".into()
}
fn default_hostname() -> String {
    "teachengineering.org".into()
}
fn default_language() -> String {
    "en".into()
}

/// `[scrape]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Whether videos are actually downloaded (metadata is always fetched).
    #[serde(default)]
    pub download_videos: bool,

    /// Record embed-only video URLs as metadata-only entries instead of
    /// skipping them.
    #[serde(default)]
    pub record_embed_only: bool,

    /// Treat channel/user URLs as video candidates.
    #[serde(default)]
    pub include_video_channels: bool,

    /// Resolution ceiling for downloaded videos.
    #[serde(default = "default_max_video_height")]
    pub max_video_height: u32,

    /// Fixed sleep between resource fetches, in milliseconds.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    /// Attempt bound for transient network errors.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed backoff between retries, in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Working directory for menus, PDFs, videos, and tree files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            download_videos: false,
            record_embed_only: false,
            include_video_channels: false,
            max_video_height: default_max_video_height(),
            rate_limit_ms: default_rate_limit(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_max_video_height() -> u32 {
    720
}
fn default_rate_limit() -> u64 {
    100
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    3
}
fn default_data_dir() -> String {
    "chefdata".into()
}

/// `[discovery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Page size for search index pagination.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Attempt bound for malformed index pages before giving up.
    #[serde(default = "default_discovery_retries")]
    pub max_retries: u32,

    /// Fixed delay before retrying a malformed index page, in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retries: default_discovery_retries(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

fn default_batch_size() -> u64 {
    10
}
fn default_discovery_retries() -> u32 {
    5
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.currichef/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ChefError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.currichef/currichef.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ChefError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ChefError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ChefError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ChefError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ChefError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
