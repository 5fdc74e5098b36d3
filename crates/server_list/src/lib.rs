//! Server List - ping response customization
//!
//! Rewrites the status response a game server sends to the multiplayer server
//! list, based on who is asking and how the server is doing:
//! - Placeholder sets built from player and server facts
//! - Literal `${domain field}` replacement
//! - Markup and legacy color code parsing into styled text
//! - Priority ordered profiles selected by condition expressions
//! - A concurrent favicon cache with lazy PNG decoding
//!
//! Platforms plug in through [`ping::Platform`] and drive everything with
//! [`ping::PingHandler::handle`].

pub mod config;
pub mod error;
pub mod favicon;
pub mod hook;
pub mod ping;
pub mod placeholders;
pub mod profiles;
pub mod replacer;
pub mod text;
pub mod tracking;

pub use config::ServerListSettings;
pub use error::{ServerListError, ServerListResult};
pub use favicon::{ByteSource, DecodedIcon, DirectorySource, FaviconCache, IconDecoder, PngDecoder};
pub use hook::PlaceholderEngine;
pub use ping::{PingHandler, PingRequest, PingResponse, Platform};
pub use placeholders::{PlaceholderSet, PlaceholderSource, PlaceholderValue, PlayerContext, ServerContext};
pub use profiles::{ProfileManager, ProfileSnapshot, ProfileStore, ServerListProfile};
pub use text::{ComponentParser, StyledText};
pub use tracking::{HostTracker, PlayerCache};
