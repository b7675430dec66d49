//! Playlist persistence.
//!
//! Each playlist is an ordered list of track paths, keyed by name and kept
//! in one JSON file next to the metadata cache. Like the cache, the store
//! is forgiving: an unreadable file starts fresh and failed writes are
//! logged and retried on the next mutation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const PLAYLISTS_FILENAME: &str = ".kiai_playlists.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Playlist {
    pub tracks: Vec<String>,
}

impl Playlist {
    /// Append `path` unless it is already present.
    pub fn add(&mut self, path: &str) {
        if !self.tracks.iter().any(|t| t == path) {
            self.tracks.push(path.to_string());
        }
    }

    pub fn remove(&mut self, path: &str) {
        self.tracks.retain(|t| t != path);
    }
}

pub struct PlaylistStore {
    path: PathBuf,
    playlists: BTreeMap<String, Playlist>,
}

impl PlaylistStore {
    pub fn new(path: PathBuf) -> Self {
        let mut store = Self {
            path,
            playlists: BTreeMap::new(),
        };
        store.load();
        store
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(PLAYLISTS_FILENAME))
            .unwrap_or_else(|| PathBuf::from(PLAYLISTS_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&mut self) {
        let Ok(bytes) = fs::read(&self.path) else {
            return;
        };
        match serde_json::from_slice(&bytes) {
            Ok(map) => self.playlists = map,
            Err(e) => {
                warn!(
                    "discarding unreadable playlists file {}: {e}",
                    self.path.display()
                );
            }
        }
    }

    fn save(&self) {
        match serde_json::to_vec_pretty(&self.playlists) {
            Ok(bytes) => {
                if let Err(e) = fs::write(&self.path, bytes) {
                    warn!("failed to write playlists {}: {e}", self.path.display());
                }
            }
            Err(e) => warn!("failed to encode playlists: {e}"),
        }
    }

    /// Playlist names in sorted order.
    pub fn list_names(&self) -> Vec<String> {
        self.playlists.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Playlist> {
        self.playlists.get(name)
    }

    /// Create `name` if missing. Blank names are rejected; creating an
    /// existing playlist is a no-op.
    pub fn create(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.playlists.entry(name.to_string()).or_default();
        self.save();
        true
    }

    pub fn delete(&mut self, name: &str) {
        if self.playlists.remove(name).is_some() {
            self.save();
        }
    }

    /// Add `path` to `name`, creating the playlist on demand. Adding an
    /// already-present path is a no-op.
    pub fn add_track(&mut self, name: &str, path: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        self.playlists
            .entry(name.to_string())
            .or_default()
            .add(path);
        self.save();
    }

    pub fn remove_track(&mut self, name: &str, path: &str) {
        if let Some(playlist) = self.playlists.get_mut(name) {
            playlist.remove(path);
            self.save();
        }
    }
}
