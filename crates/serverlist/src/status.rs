//! Status response JSON as sent to clients, and the platform that fills it.

use serde::{Deserialize, Serialize};
use server_list::error::FaviconResult;
use server_list::{DecodedIcon, PingResponse, Platform, StyledText};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePlayer {
    pub name: String,
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub name: String,
    pub protocol: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
    pub max: u32,
    pub online: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample: Vec<SamplePlayer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: Version,
    /// Absent when players are hidden
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<Players>,
    pub description: StyledText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

impl StatusResponse {
    pub fn new(version: impl Into<String>, protocol: i32, online: u32, max: u32) -> Self {
        Self {
            version: Version {
                name: version.into(),
                protocol,
            },
            players: Some(Players {
                max,
                online,
                sample: Vec::new(),
            }),
            description: StyledText::text("A Minecraft Server"),
            favicon: None,
        }
    }

    /// Applies the changes of a handled ping. Untouched fields keep their value.
    pub fn apply(&mut self, response: PingResponse<JsonPlatform>) {
        if let Some(motd) = response.motd {
            self.description = motd;
        }
        if let Some(players) = self.players.as_mut() {
            if let Some(max) = response.players_max {
                players.max = max;
            }
            if let Some(sample) = response.sample_players {
                players.sample = sample;
            }
        }
        if response.hide_players {
            self.players = None;
        }
        if let Some(name) = response.version_name {
            self.version.name = name;
        }
        if let Some(protocol) = response.protocol {
            self.version.protocol = protocol;
        }
        if let Some(favicon) = response.favicon {
            self.favicon = Some(favicon.as_ref().clone());
        }
    }
}

/// Platform producing JSON status types. Favicons are `data:` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPlatform;

impl Platform for JsonPlatform {
    type Favicon = String;
    type SamplePlayer = SamplePlayer;

    fn favicon(&self, icon: DecodedIcon) -> FaviconResult<String> {
        Ok(icon.data_uri().to_string())
    }

    fn sample_player(&self, name: String, id: Uuid) -> SamplePlayer {
        SamplePlayer { name, id }
    }
}
