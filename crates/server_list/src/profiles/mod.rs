//! # Server list profiles
//!
//! A profile bundles the display rules applied to a ping: MOTD, player count
//! text, sample players and favicon. Profiles are loaded from TOML files and are
//! read-only afterwards; a reload replaces the whole set at once (see [`store`]).
//!
//! ```toml
//! priority = 10
//! condition = "${server host} ~= event.example.net"
//! motd = ["<gold>Event server", "${server playersOnline} playing"]
//! players = ["<aqua>${player name}", "and friends"]
//! favicon = "event.png"
//!
//! [player_count]
//! text = "${server playersOnline}/${server playersMax}"
//!
//! [player_count.extra_players]
//! enabled = true
//! amount = 1
//! ```

pub mod condition;
pub mod manager;
pub mod store;

pub use manager::{ProfileManager, ProfileSnapshot};
pub use store::{load_profiles, ProfileStore};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Maximum number of MOTD lines a client displays
pub const MAX_MOTD_LINES: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraPlayers {
    pub enabled: bool,
    pub amount: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerCount {
    /// Hides the player count and sample players entirely
    pub hide_players: bool,
    /// Replaces the version/player count field
    pub text: String,
    pub extra_players: ExtraPlayers,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerListProfile {
    /// Profile name, defaults to the file stem
    pub name: String,
    /// Higher priorities are evaluated first
    pub priority: i32,
    /// Absent means the profile always matches
    pub condition: Option<String>,
    /// The fallback returned when no other profile matches
    #[serde(rename = "default")]
    pub is_default: bool,
    pub motd: Vec<String>,
    pub player_count: PlayerCount,
    pub players: Vec<String>,
    /// Favicon key, may contain placeholders
    pub favicon: String,
}

impl ServerListProfile {
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            priority,
            ..Self::default()
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn should_hide_players(&self) -> bool {
        self.player_count.hide_players
    }

    pub fn is_extra_players_enabled(&self) -> bool {
        self.player_count.extra_players.enabled
    }

    /// Maximum shown to clients: `online + amount` when extra players are enabled.
    pub fn effective_max(&self, online: u32, max: u32) -> u32 {
        if !self.is_extra_players_enabled() {
            return max;
        }
        let extended = online as i64 + self.player_count.extra_players.amount as i64;
        extended.clamp(0, u32::MAX as i64) as u32
    }

    /// Trims the MOTD to the lines a client can show.
    pub(crate) fn normalize(&mut self) {
        if self.motd.len() > MAX_MOTD_LINES {
            warn!(
                "Profile {} has {} MOTD lines, only the first {} are used",
                self.name,
                self.motd.len(),
                MAX_MOTD_LINES
            );
            self.motd.truncate(MAX_MOTD_LINES);
        }
        if let Some(condition) = &self.condition {
            if condition.trim().is_empty() {
                self.condition = None;
            }
        }
    }
}

/// Parses a single profile document. `name` is used when the document has none.
pub fn parse_profile(name: &str, content: &str) -> Result<ServerListProfile, toml::de::Error> {
    let mut profile: ServerListProfile = toml::from_str(content)?;
    if profile.name.is_empty() {
        profile.name = name.to_string();
    }
    profile.normalize();
    Ok(profile)
}
