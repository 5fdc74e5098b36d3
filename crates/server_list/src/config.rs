//! Settings consumed by the ping pipeline.

use crate::error::ConfigError;
use crate::favicon::DEFAULT_FAVICON_SIZE;
use crate::tracking::DEFAULT_TRACKED_HOSTS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_profiles_directory() -> PathBuf {
    PathBuf::from("profiles")
}

fn default_favicons_directory() -> PathBuf {
    PathBuf::from("favicons")
}

fn default_player_cache_file() -> PathBuf {
    PathBuf::from("players.json")
}

fn default_unknown_player_name() -> String {
    "Anonymous".to_string()
}

fn default_favicon_size() -> u32 {
    DEFAULT_FAVICON_SIZE
}

fn default_tracked_hosts() -> usize {
    DEFAULT_TRACKED_HOSTS
}

/// Largest accepted favicon edge length
pub const MAX_FAVICON_SIZE: u32 = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerListSettings {
    /// Directory containing one TOML file per profile
    #[serde(default = "default_profiles_directory")]
    pub profiles_directory: PathBuf,
    /// Directory favicon keys are resolved against
    #[serde(default = "default_favicons_directory")]
    pub favicons_directory: PathBuf,
    /// JSON file remembering the last player name per address
    #[serde(default = "default_player_cache_file")]
    pub player_cache_file: PathBuf,
    /// `${player name}` for addresses that never joined
    #[serde(default = "default_unknown_player_name")]
    pub unknown_player_name: String,
    /// Whether the external placeholder engine is consulted
    #[serde(default)]
    pub placeholder_engine: bool,
    /// Edge length favicons are scaled to
    #[serde(default = "default_favicon_size")]
    pub favicon_size: u32,
    /// Most client addresses whose handshake host is remembered
    #[serde(default = "default_tracked_hosts")]
    pub tracked_hosts: usize,
}

impl Default for ServerListSettings {
    fn default() -> Self {
        Self {
            profiles_directory: default_profiles_directory(),
            favicons_directory: default_favicons_directory(),
            player_cache_file: default_player_cache_file(),
            unknown_player_name: default_unknown_player_name(),
            placeholder_engine: false,
            favicon_size: default_favicon_size(),
            tracked_hosts: default_tracked_hosts(),
        }
    }
}

impl ServerListSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profiles_directory.as_os_str().is_empty() {
            return Err(ConfigError::InvalidSetting(
                "profiles_directory",
                "cannot be empty".to_string(),
            ));
        }
        if self.favicons_directory.as_os_str().is_empty() {
            return Err(ConfigError::InvalidSetting(
                "favicons_directory",
                "cannot be empty".to_string(),
            ));
        }
        if self.unknown_player_name.trim().is_empty() {
            return Err(ConfigError::InvalidSetting(
                "unknown_player_name",
                "cannot be blank".to_string(),
            ));
        }
        if self.favicon_size == 0 || self.favicon_size > MAX_FAVICON_SIZE {
            return Err(ConfigError::InvalidSetting(
                "favicon_size",
                format!("must be between 1 and {}, got {}", MAX_FAVICON_SIZE, self.favicon_size),
            ));
        }
        if self.tracked_hosts == 0 {
            return Err(ConfigError::InvalidSetting(
                "tracked_hosts",
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
