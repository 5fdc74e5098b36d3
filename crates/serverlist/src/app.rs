use crate::cli::PreviewArgs;
use crate::config::AppConfig;
use crate::status::{JsonPlatform, StatusResponse};
use anyhow::{Context, Result};
use server_list::profiles::load_profiles;
use server_list::{PingHandler, PingRequest, PlayerCache, ServerListProfile};
use tracing::{info, warn};

/// Version string reported when no profile overrides it
const VERSION_NAME: &str = "1.20.1";

/// Owns the ping handler for one configuration.
pub struct Application {
    handler: PingHandler<JsonPlatform>,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let settings = config.server_list;
        let snapshot = load_profiles(&settings.profiles_directory)
            .await
            .with_context(|| {
                format!(
                    "Failed to load profiles from {}",
                    settings.profiles_directory.display()
                )
            })?;

        let players = match PlayerCache::load(&settings.player_cache_file, settings.unknown_player_name.clone()).await {
            Ok(players) => players,
            Err(e) => {
                warn!("Starting with an empty player cache: {}", e);
                PlayerCache::new(&settings.player_cache_file, settings.unknown_player_name.clone())
            }
        };

        let handler = PingHandler::new(JsonPlatform, settings, snapshot).with_player_cache(players);
        info!("Loaded {} profiles", handler.profiles().snapshot().len());
        Ok(Self { handler })
    }

    pub fn handler(&self) -> &PingHandler<JsonPlatform> {
        &self.handler
    }

    /// Renders the status response for a simulated ping.
    pub fn preview(&self, args: &PreviewArgs) -> StatusResponse {
        if let Some(player) = &args.player {
            self.handler.on_login(args.address, player.clone(), None);
        }

        let mut request = PingRequest::new(args.address, args.protocol, args.online, args.max);
        request.virtual_host = args.host.clone();

        let mut status = StatusResponse::new(VERSION_NAME, args.protocol, args.online, args.max);
        let response = self.handler.handle(&request);
        info!("Preview rendered with profile {}", response.profile);
        status.apply(response);
        status
    }

    /// Profiles in evaluation order.
    pub fn profiles(&self) -> Vec<ServerListProfile> {
        self.handler.profiles().snapshot().profiles().cloned().collect()
    }

    /// Persists the player cache.
    pub async fn save(&self) -> Result<()> {
        self.handler
            .save_players()
            .await
            .context("Failed to save player cache")
    }
}
