//! On-disk metadata cache.
//!
//! The cache is a convenience, never an authority: any read problem is a
//! cold start with an empty mapping, and write failures are logged and
//! retried at the next natural save point. Alongside the track records it
//! carries the couple of UI settings worth keeping across restarts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::audio::PlayMode;

use super::model::{Track, TrackMeta};

pub const CACHE_FILENAME: &str = ".kiai_cache.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheRecord {
    pub path: String,
    pub folder_title: String,
    pub meta: TrackMeta,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub dark_mode: bool,
    pub play_mode: PlayMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheFile {
    pub items: Vec<CacheRecord>,
    pub settings: CacheSettings,
}

/// On-disk shape: the settings wrapper, or the bare record list written by
/// earlier versions.
#[derive(Deserialize)]
#[serde(untagged)]
enum CacheOnDisk {
    Wrapped(CacheFile),
    Bare(Vec<CacheRecord>),
}

impl CacheFile {
    /// Snapshot the current index (plus settings) for persistence.
    pub fn from_index(tracks: &[Track], settings: CacheSettings) -> Self {
        Self {
            items: tracks
                .iter()
                .map(|t| CacheRecord {
                    path: t.path.to_string_lossy().into_owned(),
                    folder_title: t.folder_title.clone(),
                    meta: t.meta.clone(),
                })
                .collect(),
            settings,
        }
    }

    /// The `path -> meta` mapping handed to the scanner for freshness checks.
    pub fn meta_by_path(&self) -> HashMap<String, TrackMeta> {
        self.items
            .iter()
            .map(|rec| (rec.path.clone(), rec.meta.clone()))
            .collect()
    }
}

pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The cache lives next to the user's home directory, like the playlist
    /// store.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(CACHE_FILENAME))
            .unwrap_or_else(|| PathBuf::from(CACHE_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cache; any read or parse error yields an empty one.
    pub fn load(&self) -> CacheFile {
        let Ok(bytes) = fs::read(&self.path) else {
            return CacheFile::default();
        };
        match serde_json::from_slice::<CacheOnDisk>(&bytes) {
            Ok(CacheOnDisk::Wrapped(cache)) => cache,
            Ok(CacheOnDisk::Bare(items)) => CacheFile {
                items,
                settings: CacheSettings::default(),
            },
            Err(e) => {
                warn!("discarding unreadable cache {}: {e}", self.path.display());
                CacheFile::default()
            }
        }
    }

    /// Best-effort save; failures are logged and swallowed.
    pub fn save(&self, cache: &CacheFile) {
        match serde_json::to_vec(cache) {
            Ok(bytes) => {
                if let Err(e) = fs::write(&self.path, bytes) {
                    warn!("failed to write cache {}: {e}", self.path.display());
                }
            }
            Err(e) => warn!("failed to encode cache: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(path: &str, title: &str, duration: Option<u64>) -> CacheRecord {
        CacheRecord {
            path: path.to_string(),
            folder_title: title.to_string(),
            meta: TrackMeta {
                title: Some(title.to_string()),
                duration,
                ..TrackMeta::default()
            },
        }
    }

    #[test]
    fn round_trips_items_and_settings() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("cache.json"));

        let cache = CacheFile {
            items: vec![
                record("/songs/1 A/a.mp3", "A", Some(120)),
                record("/songs/2 B/b.mp3", "B", None),
            ],
            settings: CacheSettings {
                dark_mode: true,
                play_mode: PlayMode::Shuffle,
            },
        };
        store.save(&cache);

        let loaded = store.load();
        assert_eq!(loaded, cache);

        // save(load(save(m))) is byte-stable.
        let first = std::fs::read(store.path()).unwrap();
        store.save(&loaded);
        let second = std::fs::read(store.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_or_corrupt_cache_loads_empty() {
        let dir = tempdir().unwrap();

        let store = MetadataStore::new(dir.path().join("nope.json"));
        assert_eq!(store.load(), CacheFile::default());

        let corrupt = MetadataStore::new(dir.path().join("bad.json"));
        std::fs::write(corrupt.path(), b"{not json").unwrap();
        assert_eq!(corrupt.load(), CacheFile::default());
    }

    #[test]
    fn bare_array_format_still_loads() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("old.json"));
        std::fs::write(
            store.path(),
            br#"[{"path":"/s/1 A/a.mp3","folder_title":"A","meta":{"title":"A","duration":61}}]"#,
        )
        .unwrap();

        let loaded = store.load();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].folder_title, "A");
        assert_eq!(loaded.items[0].meta.duration, Some(61));
        assert_eq!(loaded.settings, CacheSettings::default());
    }

    #[test]
    fn save_to_unwritable_destination_is_swallowed() {
        let store = MetadataStore::new(PathBuf::from("/nonexistent-dir/cache.json"));
        store.save(&CacheFile::default());
    }

    #[test]
    fn meta_by_path_maps_every_record() {
        let cache = CacheFile {
            items: vec![record("/a", "A", Some(9)), record("/b", "B", None)],
            settings: CacheSettings::default(),
        };
        let map = cache.meta_by_path();
        assert_eq!(map.len(), 2);
        assert_eq!(map["/a"].duration, Some(9));
    }
}
