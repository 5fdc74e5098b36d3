//! The ping pipeline.
//!
//! [`PingHandler::handle`] turns the facts of one status request into the set of
//! changes a platform applies to its outbound response:
//!
//! 1. build player and server placeholders
//! 2. select a profile with both sets
//! 3. apply extra players to the maximum and rebuild the server placeholders
//! 4. render the MOTD
//! 5. hide players if requested
//! 6. render the player count text into the version field (protocol `-1`)
//! 7. render sample players
//! 8. resolve the favicon
//!
//! Every step recovers from its own failures, so `handle` always produces a
//! response. A `None` field means "leave the platform's value untouched".

use crate::config::ServerListSettings;
use crate::error::{FaviconResult, ServerListResult};
use crate::favicon::{ByteSource, DecodedIcon, DirectorySource, FaviconCache, IconDecoder, PngDecoder};
use crate::hook::PlaceholderEngine;
use crate::placeholders::{PlaceholderSet, PlaceholderSource, PlaceholderValue, PlayerContext, ServerContext};
use crate::profiles::{ProfileManager, ProfileSnapshot, ProfileStore, ServerListProfile};
use crate::replacer;
use crate::text::{ComponentParser, StyledText};
use crate::tracking::{HostTracker, PlayerCache};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Conversions into a platform's native response types.
pub trait Platform: Send + Sync {
    type Favicon: Send + Sync;
    type SamplePlayer;

    /// Converts a decoded icon. An error leaves the previous icon in place.
    fn favicon(&self, icon: DecodedIcon) -> FaviconResult<Self::Favicon>;

    /// Creates one sample player line shown when hovering the player count.
    fn sample_player(&self, name: String, id: Uuid) -> Self::SamplePlayer;
}

/// Facts of one inbound status request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingRequest {
    pub address: IpAddr,
    pub protocol: i32,
    pub players_online: u32,
    pub players_max: u32,
    /// Host name from the handshake, when the platform exposes it
    pub virtual_host: Option<String>,
    /// Whether the resolved player is connected right now, when the platform knows
    pub online: Option<bool>,
    /// Extra player facts, exposed as `${player <key>}`
    pub extra: BTreeMap<String, PlaceholderValue>,
}

impl PingRequest {
    pub fn new(address: IpAddr, protocol: i32, players_online: u32, players_max: u32) -> Self {
        Self {
            address,
            protocol,
            players_online,
            players_max,
            virtual_host: None,
            online: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.virtual_host = Some(host.into());
        self
    }

    pub fn with_online(mut self, online: bool) -> Self {
        self.online = Some(online);
        self
    }

    pub fn with_extra(mut self, field: impl Into<String>, value: impl Into<PlaceholderValue>) -> Self {
        self.extra.insert(field.into(), value.into());
        self
    }
}

/// Changes to apply to the outbound response.
pub struct PingResponse<P: Platform> {
    /// Name of the selected profile
    pub profile: String,
    pub motd: Option<StyledText>,
    pub players_max: Option<u32>,
    pub hide_players: bool,
    pub version_name: Option<String>,
    pub protocol: Option<i32>,
    pub sample_players: Option<Vec<P::SamplePlayer>>,
    pub favicon: Option<Arc<P::Favicon>>,
}

impl<P: Platform> PingResponse<P> {
    fn untouched(profile: &ServerListProfile) -> Self {
        Self {
            profile: profile.name.clone(),
            motd: None,
            players_max: None,
            hide_players: false,
            version_name: None,
            protocol: None,
            sample_players: None,
            favicon: None,
        }
    }
}

pub struct PingHandler<P: Platform> {
    platform: P,
    settings: ServerListSettings,
    profiles: ProfileStore,
    favicons: FaviconCache<P::Favicon>,
    source: Box<dyn ByteSource>,
    decoder: PngDecoder,
    players: PlayerCache,
    hosts: HostTracker,
    engine: Option<Arc<dyn PlaceholderEngine>>,
}

impl<P: Platform> PingHandler<P> {
    pub fn new(platform: P, settings: ServerListSettings, profiles: ProfileSnapshot) -> Self {
        Self {
            platform,
            source: Box::new(DirectorySource::new(&settings.favicons_directory)),
            decoder: PngDecoder::new(settings.favicon_size),
            players: PlayerCache::new(&settings.player_cache_file, settings.unknown_player_name.clone()),
            profiles: ProfileStore::new(profiles),
            favicons: FaviconCache::new(),
            hosts: HostTracker::with_capacity(settings.tracked_hosts),
            engine: None,
            settings,
        }
    }

    /// Replaces the favicon byte source.
    pub fn with_source(mut self, source: impl ByteSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn PlaceholderEngine>) -> Self {
        if self.settings.placeholder_engine {
            info!("Using placeholder engine {}", engine.name());
        } else {
            debug!("Placeholder engine {} registered but disabled", engine.name());
        }
        self.engine = Some(engine);
        self
    }

    pub fn with_player_cache(mut self, players: PlayerCache) -> Self {
        self.players = players;
        self
    }

    pub fn settings(&self) -> &ServerListSettings {
        &self.settings
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn favicons(&self) -> &FaviconCache<P::Favicon> {
        &self.favicons
    }

    pub fn players(&self) -> &PlayerCache {
        &self.players
    }

    pub fn hosts(&self) -> &HostTracker {
        &self.hosts
    }

    /// Remembers who joined from `address`.
    pub fn on_login(&self, address: IpAddr, name: impl Into<String>, uuid: Option<Uuid>) {
        self.players.remember(address, name, uuid);
    }

    /// Remembers the host name a client connected through.
    pub fn on_handshake(&self, address: IpAddr, host: impl Into<String>) {
        self.hosts.record(address, host);
    }

    /// Publishes a new profile set and drops cached favicons.
    pub fn replace_profiles(&self, profiles: ProfileSnapshot) {
        self.profiles.replace(profiles);
        self.favicons.clear();
    }

    /// Reloads profiles from the configured directory. On error the current
    /// profiles and favicons stay in use.
    pub async fn reload(&self) -> ServerListResult<usize> {
        let count = self.profiles.reload(&self.settings.profiles_directory).await?;
        self.favicons.clear();
        Ok(count)
    }

    /// Persists the player cache to the configured file.
    pub async fn save_players(&self) -> ServerListResult<()> {
        self.players.save().await?;
        Ok(())
    }

    fn engine(&self) -> Option<&Arc<dyn PlaceholderEngine>> {
        self.engine.as_ref().filter(|_| self.settings.placeholder_engine)
    }

    fn player_context(&self, request: &PingRequest) -> PlayerContext {
        let cached = self.players.lookup(&request.address);
        let name = cached
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| self.players.unknown_name().to_string());

        let mut player = PlayerContext::new(name, request.protocol);
        if let Some(uuid) = cached.as_ref().and_then(|p| p.uuid) {
            player = player.with_uuid(uuid);
        }
        player.played_before = cached.is_some();
        player.online = request.online.unwrap_or(false);
        player.extra = request.extra.clone();
        player
    }

    fn hooked<'a>(&'a self, parser: ComponentParser<'a>, player: &'a PlayerContext) -> ComponentParser<'a> {
        match self.engine() {
            Some(engine) => parser.modify_text_as(engine.name(), move |text| engine.expand(text, player)),
            None => parser,
        }
    }

    fn resolve_favicon(&self, key: &str) -> Option<Arc<P::Favicon>> {
        let decoder = |key: &str, bytes: &[u8]| -> FaviconResult<P::Favicon> {
            let icon = self.decoder.decode(key, bytes)?;
            self.platform.favicon(icon)
        };
        self.favicons.get(key, self.source.as_ref(), &decoder)
    }

    pub fn handle(&self, request: &PingRequest) -> PingResponse<P> {
        if let Some(host) = &request.virtual_host {
            self.hosts.record(request.address, host.clone());
        }
        let host = request
            .virtual_host
            .clone()
            .or_else(|| self.hosts.host_for(&request.address));

        let player_context = self.player_context(request);
        let player = player_context.placeholders();
        let mut server_context = ServerContext::new(request.players_online, request.players_max, host);

        let snapshot = self.profiles.snapshot();
        let profile = ProfileManager::new(&snapshot)
            .replacements(&player)
            .replacements(&server_context.placeholders())
            .profile();
        let mut response = PingResponse::untouched(profile);

        if profile.is_extra_players_enabled() {
            let max = profile.effective_max(request.players_online, request.players_max);
            response.players_max = Some(max);
            server_context = server_context.with_max(max);
        }
        let server = server_context.placeholders();

        if !profile.motd.is_empty() {
            let parser = ComponentParser::list(&profile.motd)
                .replacements(&player)
                .replacements(&server);
            response.motd = Some(self.hooked(parser, &player_context).to_component());
        }

        let hide_players = profile.should_hide_players();
        response.hide_players = hide_players;

        if !profile.player_count.text.is_empty() && !hide_players {
            let parser = ComponentParser::text(profile.player_count.text.as_str())
                .replacements(&player)
                .replacements(&server);
            response.version_name = Some(self.hooked(parser, &player_context).to_legacy_string());
            response.protocol = Some(-1);
        }

        if !profile.players.is_empty() && !hide_players {
            let sample = profile
                .players
                .iter()
                .map(|line| {
                    let name = ComponentParser::text(line.as_str())
                        .replacements(&player)
                        .replacements(&server)
                        .to_legacy_string();
                    self.platform.sample_player(name, Uuid::new_v4())
                })
                .collect();
            response.sample_players = Some(sample);
        }

        if !profile.favicon.is_empty() {
            let merged = PlaceholderSet::for_ping(&player_context, &server_context);
            let key = replacer::replace(&profile.favicon, &merged);
            response.favicon = self.resolve_favicon(&key);
            if response.favicon.is_none() {
                warn!("Could not obtain a valid favicon for key {}", key);
            }
        }

        debug!(
            "Handled ping from {} with profile {}",
            request.address, response.profile
        );
        response
    }
}
