//! # Placeholder sets
//!
//! A [`PlaceholderSet`] maps tokens of the form `${domain field}` to typed values.
//! Every ping builds two independent sets, one from player facts and one from
//! server facts, and overlays them in that order:
//!
//! ```rust
//! use server_list::placeholders::{PlayerContext, ServerContext, PlaceholderSet};
//!
//! let player = PlayerContext::new("Steve", 763);
//! let server = ServerContext::new(5, 20, None);
//! let set = PlaceholderSet::for_ping(&player, &server);
//! assert_eq!(set.get("${server playersOnline}").map(|v| v.to_string()), Some("5".into()));
//! ```
//!
//! The server set is applied second, so it wins any collision with the player
//! set. This ordering is part of the contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Builds the token string for a domain and field, e.g. `${player name}`.
pub fn token(domain: &str, field: &str) -> String {
    format!("${{{} {}}}", domain, field)
}

/// A typed placeholder value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaceholderValue {
    Boolean(bool),
    Integer(i64),
    Text(String),
}

impl fmt::Display for PlaceholderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderValue::Boolean(value) => write!(f, "{}", value),
            PlaceholderValue::Integer(value) => write!(f, "{}", value),
            PlaceholderValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for PlaceholderValue {
    fn from(value: bool) -> Self {
        PlaceholderValue::Boolean(value)
    }
}

impl From<i64> for PlaceholderValue {
    fn from(value: i64) -> Self {
        PlaceholderValue::Integer(value)
    }
}

impl From<i32> for PlaceholderValue {
    fn from(value: i32) -> Self {
        PlaceholderValue::Integer(value as i64)
    }
}

impl From<u32> for PlaceholderValue {
    fn from(value: u32) -> Self {
        PlaceholderValue::Integer(value as i64)
    }
}

impl From<String> for PlaceholderValue {
    fn from(value: String) -> Self {
        PlaceholderValue::Text(value)
    }
}

impl From<&str> for PlaceholderValue {
    fn from(value: &str) -> Self {
        PlaceholderValue::Text(value.to_string())
    }
}

/// Mapping from placeholder token to value.
///
/// Iteration is in token order, which keeps rendering and tests deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderSet {
    values: BTreeMap<String, PlaceholderValue>,
}

impl PlaceholderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value for the same token.
    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<PlaceholderValue>) {
        self.values.insert(token.into(), value.into());
    }

    /// Inserts a value only when present. Absent values are omitted, not stored empty.
    pub fn insert_opt<V: Into<PlaceholderValue>>(&mut self, token: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.insert(token, value);
        }
    }

    pub fn get(&self, token: &str) -> Option<&PlaceholderValue> {
        self.values.get(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.values.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlaceholderValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlays `other` onto this set in place. `other` wins on collision.
    pub fn overlay(&mut self, other: &PlaceholderSet) {
        for (token, value) in &other.values {
            self.values.insert(token.clone(), value.clone());
        }
    }

    /// Returns a new set with `other` overlaid onto `self` (right-biased).
    pub fn merge(&self, other: &PlaceholderSet) -> PlaceholderSet {
        let mut merged = self.clone();
        merged.overlay(other);
        merged
    }

    /// Builds the combined set for a ping: player facts first, server facts second.
    pub fn for_ping(player: &PlayerContext, server: &ServerContext) -> PlaceholderSet {
        player.placeholders().merge(&server.placeholders())
    }
}

impl<K: Into<String>, V: Into<PlaceholderValue>> FromIterator<(K, V)> for PlaceholderSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = PlaceholderSet::new();
        for (token, value) in iter {
            set.insert(token, value);
        }
        set
    }
}

/// A context object that can describe itself as placeholders.
///
/// Building never fails; missing optional facts simply leave tokens out.
pub trait PlaceholderSource {
    fn placeholders(&self) -> PlaceholderSet;
}

/// Facts about the (possibly unknown) player behind a ping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerContext {
    /// Last known name for the pinging address, or the configured unknown name
    pub name: String,
    /// Protocol version announced by the client
    pub protocol: i32,
    /// Account id when the player could be resolved
    pub uuid: Option<Uuid>,
    /// Whether the player is currently connected
    pub online: bool,
    /// Whether the account has joined this server before
    pub played_before: bool,
    /// Additional facts exposed as `${player <key>}`
    #[serde(default)]
    pub extra: BTreeMap<String, PlaceholderValue>,
}

impl PlayerContext {
    pub fn new(name: impl Into<String>, protocol: i32) -> Self {
        Self {
            name: name.into(),
            protocol,
            uuid: None,
            online: false,
            played_before: false,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn with_extra(mut self, field: impl Into<String>, value: impl Into<PlaceholderValue>) -> Self {
        self.extra.insert(field.into(), value.into());
        self
    }
}

impl PlaceholderSource for PlayerContext {
    fn placeholders(&self) -> PlaceholderSet {
        let mut set = PlaceholderSet::new();

        // Built-in fields are written last so extras cannot shadow them.
        for (field, value) in &self.extra {
            set.insert(token("player", field), value.clone());
        }

        set.insert(token("player", "name"), self.name.as_str());
        set.insert(token("player", "protocol"), self.protocol);
        set.insert_opt(token("player", "uuid"), self.uuid.map(|u| u.to_string()));
        set.insert(token("player", "isOnline"), self.online);
        set.insert(token("player", "hasPlayedBefore"), self.played_before);
        set
    }
}

/// Facts about the server at the time of the ping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerContext {
    pub players_online: u32,
    pub players_max: u32,
    /// Virtual host from the handshake. Unknown before a handshake was observed.
    pub host: Option<String>,
}

impl ServerContext {
    pub fn new(players_online: u32, players_max: u32, host: Option<String>) -> Self {
        Self {
            players_online,
            players_max,
            host,
        }
    }

    /// Same facts with a different maximum, used once extra players are applied.
    pub fn with_max(&self, players_max: u32) -> Self {
        Self {
            players_max,
            ..self.clone()
        }
    }
}

impl PlaceholderSource for ServerContext {
    fn placeholders(&self) -> PlaceholderSet {
        let mut set = PlaceholderSet::new();
        set.insert(token("server", "playersOnline"), self.players_online);
        set.insert(token("server", "playersMax"), self.players_max);
        set.insert_opt(token("server", "host"), self.host.clone());
        set
    }
}
