//! Per-address memory of who pinged and through which host name.
//!
//! Status pings carry no player identity. [`PlayerCache`] remembers the last
//! name seen from an address (fed by the collaborator on login) and
//! [`HostTracker`] the host name sent in the handshake preceding a ping.
//! Every address that pings can add a host entry, so the tracker is bounded.

use crate::error::CacheError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::{fs as tokio_fs, io::AsyncWriteExt};
use tracing::{debug, info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPlayer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
}

/// Address to last known player, persisted as JSON.
#[derive(Debug)]
pub struct PlayerCache {
    path: PathBuf,
    unknown_name: String,
    players: DashMap<IpAddr, CachedPlayer>,
}

impl PlayerCache {
    pub fn new(path: impl Into<PathBuf>, unknown_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            unknown_name: unknown_name.into(),
            players: DashMap::new(),
        }
    }

    /// Loads the cache file. A missing file yields an empty cache.
    #[instrument(skip(unknown_name))]
    pub async fn load(path: &Path, unknown_name: impl Into<String>) -> Result<Self, CacheError> {
        let cache = Self::new(path, unknown_name);
        if !tokio_fs::try_exists(path)
            .await
            .map_err(|e| CacheError::Read(path.to_path_buf(), e))?
        {
            debug!("No player cache at {}, starting empty", path.display());
            return Ok(cache);
        }

        let contents = tokio_fs::read_to_string(path)
            .await
            .map_err(|e| CacheError::Read(path.to_path_buf(), e))?;
        let entries: BTreeMap<IpAddr, CachedPlayer> = serde_json::from_str(&contents)
            .map_err(|e| CacheError::Deserialization(path.to_path_buf(), e))?;

        for (address, player) in entries {
            cache.players.insert(address, player);
        }
        info!("Loaded {} cached players", cache.players.len());
        Ok(cache)
    }

    /// Writes the cache to a temporary file and renames it into place.
    #[instrument(skip(self))]
    pub async fn save(&self) -> Result<(), CacheError> {
        let entries: BTreeMap<IpAddr, CachedPlayer> = self
            .players
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        let json = serde_json::to_string_pretty(&entries).map_err(CacheError::Serialization)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio_fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::Write(parent.to_path_buf(), e))?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = tokio_fs::File::create(&temp_path)
            .await
            .map_err(|e| CacheError::Write(temp_path.clone(), e))?;
        file.write_all(json.as_bytes())
            .await
            .map_err(|e| CacheError::Write(temp_path.clone(), e))?;
        file.sync_all()
            .await
            .map_err(|e| CacheError::Write(temp_path.clone(), e))?;

        tokio_fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| CacheError::Write(self.path.clone(), e))?;

        debug!("Saved {} cached players", entries.len());
        Ok(())
    }

    pub fn remember(&self, address: IpAddr, name: impl Into<String>, uuid: Option<Uuid>) {
        self.players.insert(
            address,
            CachedPlayer {
                name: name.into(),
                uuid,
            },
        );
    }

    pub fn forget(&self, address: &IpAddr) -> Option<CachedPlayer> {
        self.players.remove(address).map(|(_, player)| player)
    }

    pub fn lookup(&self, address: &IpAddr) -> Option<CachedPlayer> {
        self.players.get(address).map(|entry| entry.value().clone())
    }

    /// The cached name, or the configured name for unknown players.
    pub fn name_for(&self, address: &IpAddr) -> String {
        self.players
            .get(address)
            .map(|entry| entry.name.clone())
            .unwrap_or_else(|| self.unknown_name.clone())
    }

    pub fn unknown_name(&self) -> &str {
        &self.unknown_name
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// Default number of addresses a [`HostTracker`] remembers
pub const DEFAULT_TRACKED_HOSTS: usize = 4096;

#[derive(Debug)]
struct TrackedHost {
    host: String,
    sequence: u64,
}

/// Address to host name of the most recent handshake.
///
/// Holds about `capacity` addresses; concurrent records may briefly exceed it.
/// Recording a new address at capacity evicts the older half.
#[derive(Debug)]
pub struct HostTracker {
    hosts: DashMap<IpAddr, TrackedHost>,
    capacity: usize,
    sequence: AtomicU64,
}

impl Default for HostTracker {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TRACKED_HOSTS)
    }
}

impl HostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hosts: DashMap::new(),
            capacity: capacity.max(1),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, address: IpAddr, host: impl Into<String>) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        if self.hosts.len() >= self.capacity && !self.hosts.contains_key(&address) {
            self.evict_older_half(sequence);
        }
        self.hosts.insert(
            address,
            TrackedHost {
                host: host.into(),
                sequence,
            },
        );
    }

    fn evict_older_half(&self, current: u64) {
        let keep = (self.capacity / 2) as u64;
        let cutoff = current.saturating_sub(keep);
        let before = self.hosts.len();
        self.hosts.retain(|_, tracked| tracked.sequence >= cutoff);
        debug!("Evicted {} tracked hosts", before.saturating_sub(self.hosts.len()));
    }

    pub fn host_for(&self, address: &IpAddr) -> Option<String> {
        self.hosts.get(address).map(|entry| entry.host.clone())
    }

    pub fn forget(&self, address: &IpAddr) {
        self.hosts.remove(address);
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tempfile::TempDir;

    fn addr(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_name_lookup_with_fallback() {
        let cache = PlayerCache::new("unused.json", "Anonymous");
        assert_eq!(cache.name_for(&addr(1)), "Anonymous");

        cache.remember(addr(1), "Steve", None);
        assert_eq!(cache.name_for(&addr(1)), "Steve");

        cache.remember(addr(1), "Alex", None);
        assert_eq!(cache.name_for(&addr(1)), "Alex");
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.forget(&addr(1)).map(|p| p.name), Some("Alex".to_string()));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("players.json");
        let uuid = Uuid::new_v4();

        let cache = PlayerCache::new(&path, "Anonymous");
        cache.remember(addr(1), "Steve", Some(uuid));
        cache.remember("::1".parse().unwrap(), "Alex", None);
        cache.save().await.unwrap();
        assert!(!path.with_extension("tmp").exists());

        let loaded = PlayerCache::load(&path, "Nobody").await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.lookup(&addr(1)).unwrap().uuid, Some(uuid));
        assert_eq!(loaded.name_for(&"::1".parse().unwrap()), "Alex");
        assert_eq!(loaded.name_for(&addr(9)), "Nobody");
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = PlayerCache::load(&dir.path().join("none.json"), "Anonymous")
            .await
            .unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("players.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PlayerCache::load(&path, "Anonymous").await,
            Err(CacheError::Deserialization(_, _))
        ));
    }

    #[test]
    fn test_host_tracker() {
        let hosts = HostTracker::new();
        assert!(hosts.host_for(&addr(2)).is_none());
        hosts.record(addr(2), "play.example.net");
        assert_eq!(hosts.host_for(&addr(2)).as_deref(), Some("play.example.net"));
        hosts.forget(&addr(2));
        assert!(hosts.is_empty());
    }

    #[test]
    fn test_host_tracker_is_bounded() {
        let hosts = HostTracker::with_capacity(8);
        for last in 0..100u8 {
            hosts.record(addr(last), format!("host{}.example.net", last));
            assert!(hosts.len() <= hosts.capacity());
        }
        // the most recent address always survives eviction
        assert_eq!(hosts.host_for(&addr(99)).as_deref(), Some("host99.example.net"));
        assert!(hosts.host_for(&addr(0)).is_none());

        // refreshing a known address at capacity evicts nothing
        let before = hosts.len();
        hosts.record(addr(99), "again.example.net");
        assert_eq!(hosts.len(), before);
        assert_eq!(hosts.host_for(&addr(99)).as_deref(), Some("again.example.net"));
    }
}
