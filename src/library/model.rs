//! Track model and the in-memory library index.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Extracted (or cached) per-track metadata.
///
/// `mtime` and `size` form the freshness stamp of the source file at the
/// time the tags were read; a mismatch on a later scan forces re-extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackMeta {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Track length in whole seconds; `None` when unknown.
    pub duration: Option<u64>,
    pub mtime: Option<u64>,
    pub size: Option<u64>,
}

impl TrackMeta {
    /// Whether this record still matches the file's current stamp.
    pub fn is_fresh(&self, mtime: Option<u64>, size: Option<u64>) -> bool {
        mtime.is_some() && size.is_some() && self.mtime == mtime && self.size == size
    }

    /// Fill in any fields this record is missing from `other`.
    pub fn merge_from(&mut self, other: &TrackMeta) {
        if self.title.is_none() {
            self.title = other.title.clone();
        }
        if self.artist.is_none() {
            self.artist = other.artist.clone();
        }
        if self.album.is_none() {
            self.album = other.album.clone();
        }
        if self.duration.is_none() {
            self.duration = other.duration;
        }
        if self.mtime.is_none() {
            self.mtime = other.mtime;
        }
        if self.size.is_none() {
            self.size = other.size;
        }
    }
}

/// One discovered audio file: the representative track of its folder.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub path: PathBuf,
    /// Folder name with the leading beatmap id stripped.
    pub folder_title: String,
    pub meta: TrackMeta,
}

impl Track {
    /// The list/now-playing title: the folder title, falling back to tags.
    pub fn display_title(&self) -> &str {
        if !self.folder_title.trim().is_empty() {
            return &self.folder_title;
        }
        self.meta.title.as_deref().unwrap_or("UNKNOWN")
    }

    pub fn duration(&self) -> Option<Duration> {
        self.meta.duration.map(Duration::from_secs)
    }

    /// Case-insensitive substring match against folder title, tag title
    /// and artist. `query_lower` must already be lowercased.
    pub fn matches(&self, query_lower: &str) -> bool {
        if self.folder_title.to_lowercase().contains(query_lower) {
            return true;
        }
        let in_field = |f: &Option<String>| {
            f.as_deref()
                .map(|v| v.to_lowercase().contains(query_lower))
                .unwrap_or(false)
        };
        in_field(&self.meta.title) || in_field(&self.meta.artist)
    }
}

/// All discovered tracks, in discovery order, unique by path.
///
/// The index is owned and mutated only by the presentation context; the
/// scanner just emits discovery events that are applied here.
#[derive(Default)]
pub struct LibraryIndex {
    tracks: Vec<Track>,
    by_path: HashMap<PathBuf, usize>,
}

impl LibraryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn position_of(&self, path: &Path) -> Option<usize> {
        self.by_path.get(path).copied()
    }

    /// Apply a discovery event. Returns `true` when the path was new; a
    /// re-discovered path is not duplicated, but its metadata is merged if
    /// the new event carried richer data.
    pub fn upsert(&mut self, track: Track) -> bool {
        match self.by_path.get(&track.path) {
            Some(&i) => {
                self.tracks[i].meta.merge_from(&track.meta);
                false
            }
            None => {
                self.by_path.insert(track.path.clone(), self.tracks.len());
                self.tracks.push(track);
                true
            }
        }
    }

    /// Indices of tracks matching `query` (all of them for a blank query),
    /// in discovery order. Always a subset of the full index.
    pub fn filtered(&self, query: &str) -> Vec<usize> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return (0..self.tracks.len()).collect();
        }
        (0..self.tracks.len())
            .filter(|&i| self.tracks[i].matches(&q))
            .collect()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.by_path.clear();
    }
}
