//! Error types for the server list core
//!
//! Only loading and validation surface these to callers. The ping path recovers
//! from every one of them locally (see `ping`), so a broken profile, hook or
//! favicon never reaches the outbound response.

use std::{io::Error as IoError, path::PathBuf};
use thiserror::Error;

/// Profile condition evaluation errors. Always recovered as "condition false".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConditionError {
    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unexpected token '{0}' at position {1}")]
    UnexpectedToken(String, usize),

    #[error("Unterminated string starting at position {0}")]
    UnterminatedString(usize),

    #[error("Unterminated placeholder starting at position {0}")]
    UnterminatedPlaceholder(usize),

    #[error("Placeholder {0} could not be resolved")]
    UnresolvedPlaceholder(String),

    #[error("Expression is empty")]
    Empty,
}

/// Failures of the external text hook. Recovered as "text unchanged".
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Hook {0} failed: {1}")]
    Failed(String, String),

    #[error("Hook {0} panicked: {1}")]
    Panicked(String, String),
}

/// Favicon lookup and decode errors. Recovered as "no icon".
#[derive(Debug, Error)]
pub enum FaviconError {
    #[error("Favicon {0} not found")]
    NotFound(String),

    #[error("Favicon key {0} is not a valid file name")]
    InvalidKey(String),

    #[error("Failed to read favicon {0}: {1}")]
    Read(PathBuf, IoError),

    #[error("Failed to decode favicon {0}: {1}")]
    Decode(String, String),

    #[error("Failed to encode favicon {0}: {1}")]
    Encode(String, String),

    #[error("Favicon {key} has invalid dimensions {width}x{height}")]
    InvalidDimensions { key: String, width: u32, height: u32 },
}

/// Profile loading errors. Surfaced at startup or reload, never per ping.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to read profile directory {0}: {1}")]
    DirectoryRead(PathBuf, IoError),

    #[error("Failed to read profile {0}: {1}")]
    FileRead(PathBuf, IoError),

    #[error("Failed to parse profile {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("No profile is flagged as default")]
    MissingDefault,

    #[error("More than one profile is flagged as default: {0:?}")]
    DuplicateDefault(Vec<String>),
}

/// Player cache persistence errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to read player cache {0}: {1}")]
    Read(PathBuf, IoError),

    #[error("Failed to write player cache {0}: {1}")]
    Write(PathBuf, IoError),

    #[error("Failed to deserialize player cache {0}: {1}")]
    Deserialization(PathBuf, serde_json::Error),

    #[error("Failed to serialize player cache: {0}")]
    Serialization(serde_json::Error),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid setting {0}: {1}")]
    InvalidSetting(&'static str, String),
}

/// Crate level error wrapping every loading concern
#[derive(Debug, Error)]
pub enum ServerListError {
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Player cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Favicon error: {0}")]
    Favicon(#[from] FaviconError),
}

pub type ServerListResult<T> = Result<T, ServerListError>;
pub type ProfileResult<T> = Result<T, ProfileError>;
pub type FaviconResult<T> = Result<T, FaviconError>;
pub type ConditionResult<T> = Result<T, ConditionError>;
