//! Application model types: `App`, `PlaybackState` and `Pane`.
//!
//! All mutation of this state happens on the presentation context; the
//! background scanner and the playback thread only reach it through the
//! events the runtime drains each frame.

use std::path::PathBuf;

use crate::audio::{PlayMode, PlaybackHandle, RunHandle, SharedMode};
use crate::library::{Artwork, CacheFile, CacheSettings, LibraryIndex, Track};
use crate::playlist::PlaylistStore;

/// The playback state of the session, as rendered. Derived from the
/// playback thread's snapshot, never from widget contents.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Which panel the cursor lives in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Library,
    Playlists,
}

/// The main application model.
pub struct App {
    pub index: LibraryIndex,
    pub selected: usize,
    pub playback: PlaybackState,
    pub playback_handle: Option<PlaybackHandle>,

    /// Session play mode, shared with the playback thread and sequencer.
    pub mode: SharedMode,
    pub dark_mode: bool,

    pub filter_mode: bool,
    pub filter_query: String,

    pub songs_dir: PathBuf,
    pub min_duration: u64,
    pub scanning: bool,
    pub excluded: usize,
    pub status: Option<String>,

    pub volume: f32,
    pub now_art: Artwork,

    /// The active sequencer run, if any. Starting another one (or a manual
    /// play) cancels it first.
    pub run: Option<RunHandle>,

    pub pane: Pane,
    pub playlist_names: Vec<String>,
    pub playlist_selected: usize,
    /// In-progress playlist name entry, when creating one.
    pub name_input: Option<String>,
}

impl App {
    pub fn new(songs_dir: PathBuf, min_duration: u64, mode: SharedMode) -> Self {
        Self {
            index: LibraryIndex::new(),
            selected: 0,
            playback: PlaybackState::Stopped,
            playback_handle: None,
            mode,
            dark_mode: false,
            filter_mode: false,
            filter_query: String::new(),
            songs_dir,
            min_duration,
            scanning: false,
            excluded: 0,
            status: None,
            volume: 1.0,
            now_art: Artwork::Placeholder,
            run: None,
            pane: Pane::Library,
            playlist_names: Vec::new(),
            playlist_selected: 0,
            name_input: None,
        }
    }

    pub fn set_playback_handle(&mut self, handle: PlaybackHandle) {
        self.playback_handle = Some(handle);
    }

    pub fn mode(&self) -> PlayMode {
        self.mode.lock().map(|m| *m).unwrap_or_default()
    }

    /// Advance the mode button through its transition table.
    pub fn cycle_play_mode(&mut self) {
        if let Ok(mut mode) = self.mode.lock() {
            *mode = mode.cycle();
        }
    }

    pub fn toggle_dark_mode(&mut self) {
        self.dark_mode = !self.dark_mode;
    }

    /// The filtered view: indices into the index matching the query.
    pub fn display_indices(&self) -> Vec<usize> {
        self.index.filtered(&self.filter_query)
    }

    pub fn has_tracks(&self) -> bool {
        !self.index.is_empty()
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.index.get(self.selected)
    }

    /// Set the selection, falling back to the first visible track when the
    /// target is filtered out.
    pub fn set_selected(&mut self, index: usize) {
        self.selected = index;
        self.ensure_selected_visible();
    }

    fn ensure_selected_visible(&mut self) {
        let display = self.display_indices();
        if display.is_empty() {
            self.selected = 0;
            return;
        }
        if !display.contains(&self.selected) {
            self.selected = display[0];
        }
    }

    /// Move the cursor down in the active pane, wrapping.
    pub fn next(&mut self) {
        match self.pane {
            Pane::Library => {
                let display = self.display_indices();
                if display.is_empty() {
                    return;
                }
                let pos = display.iter().position(|&i| i == self.selected);
                self.selected = match pos {
                    Some(p) => display[(p + 1) % display.len()],
                    None => display[0],
                };
            }
            Pane::Playlists => {
                if !self.playlist_names.is_empty() {
                    self.playlist_selected = (self.playlist_selected + 1) % self.playlist_names.len();
                }
            }
        }
    }

    /// Move the cursor up in the active pane, wrapping.
    pub fn prev(&mut self) {
        match self.pane {
            Pane::Library => {
                let display = self.display_indices();
                if display.is_empty() {
                    return;
                }
                let pos = display.iter().position(|&i| i == self.selected);
                self.selected = match pos {
                    Some(0) | None => display[display.len() - 1],
                    Some(p) => display[p - 1],
                };
            }
            Pane::Playlists => {
                if !self.playlist_names.is_empty() {
                    self.playlist_selected = self
                        .playlist_selected
                        .checked_sub(1)
                        .unwrap_or(self.playlist_names.len() - 1);
                }
            }
        }
    }

    pub fn toggle_pane(&mut self) {
        self.pane = match self.pane {
            Pane::Library => Pane::Playlists,
            Pane::Playlists => Pane::Library,
        };
    }

    pub fn enter_filter_mode(&mut self) {
        self.filter_mode = true;
        self.pane = Pane::Library;
        self.ensure_selected_visible();
    }

    pub fn exit_filter_mode(&mut self) {
        self.filter_mode = false;
    }

    pub fn clear_filter(&mut self) {
        self.filter_query.clear();
        self.filter_mode = false;
        self.ensure_selected_visible();
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter_query.push(c);
        self.ensure_selected_visible();
    }

    pub fn pop_filter_char(&mut self) {
        self.filter_query.pop();
        self.ensure_selected_visible();
    }

    /// Whether a sequencer run is still driving playback.
    pub fn run_active(&self) -> bool {
        self.run.as_ref().map(|r| r.is_active()).unwrap_or(false)
    }

    /// Cancel any active run; its thread observes the flag and exits.
    pub fn cancel_run(&mut self) {
        if let Some(run) = self.run.take() {
            run.cancel();
        }
    }

    pub fn refresh_playlists(&mut self, store: &PlaylistStore) {
        self.playlist_names = store.list_names();
        if self.playlist_selected >= self.playlist_names.len() {
            self.playlist_selected = self.playlist_names.len().saturating_sub(1);
        }
    }

    pub fn selected_playlist(&self) -> Option<&str> {
        self.playlist_names
            .get(self.playlist_selected)
            .map(String::as_str)
    }

    /// Snapshot the index and persisted settings for the metadata store.
    pub fn cache_snapshot(&self) -> CacheFile {
        CacheFile::from_index(
            self.index.tracks(),
            CacheSettings {
                dark_mode: self.dark_mode,
                play_mode: self.mode(),
            },
        )
    }
}
