//! Loading profiles from disk and publishing them to concurrent readers.

use super::{parse_profile, ProfileSnapshot, ServerListProfile};
use crate::error::{ProfileError, ProfileResult};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs as tokio_fs;
use tracing::{debug, error, info, instrument};

/// Holds the current profile snapshot. Readers get an `Arc` and never observe a
/// partially replaced set.
#[derive(Debug)]
pub struct ProfileStore {
    current: RwLock<Arc<ProfileSnapshot>>,
}

impl ProfileStore {
    pub fn new(snapshot: ProfileSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> Arc<ProfileSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Publishes `snapshot`, returning the previous one.
    pub fn replace(&self, snapshot: ProfileSnapshot) -> Arc<ProfileSnapshot> {
        std::mem::replace(&mut *self.current.write(), Arc::new(snapshot))
    }

    /// Loads `dir` and publishes it. The current set stays active on error.
    pub async fn reload(&self, dir: &Path) -> ProfileResult<usize> {
        let snapshot = load_profiles(dir).await?;
        let count = snapshot.len();
        self.replace(snapshot);
        Ok(count)
    }
}

#[instrument]
async fn load_profile_file(path: &Path) -> ProfileResult<ServerListProfile> {
    let contents = tokio_fs::read_to_string(path)
        .await
        .map_err(|e| ProfileError::FileRead(path.to_path_buf(), e))?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    parse_profile(stem, &contents).map_err(|e| ProfileError::Parse(path.to_path_buf(), e))
}

/// Loads every `*.toml` file of `dir` in file name order. Files that fail to load
/// are skipped; the result must still contain exactly one default profile.
#[instrument]
pub async fn load_profiles(dir: &Path) -> ProfileResult<ProfileSnapshot> {
    let mut entries = tokio_fs::read_dir(dir)
        .await
        .map_err(|e| ProfileError::DirectoryRead(dir.to_path_buf(), e))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ProfileError::DirectoryRead(dir.to_path_buf(), e))?
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut profiles = Vec::with_capacity(paths.len());
    for path in paths {
        match load_profile_file(&path).await {
            Ok(profile) => {
                debug!("Loaded profile: {}", profile.name);
                profiles.push(profile);
            }
            Err(e) => {
                error!("Failed to load profile from {}: {}", path.display(), e);
                continue;
            }
        }
    }

    let snapshot = ProfileSnapshot::new(profiles)?;
    info!("Loaded {} profiles from {}", snapshot.len(), dir.display());
    Ok(snapshot)
}
