//! Playback-related small types and shared handles.

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the next track is chosen when the current one ends.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// Advance through the visible list, stopping at its end.
    #[default]
    Sequential,
    /// Repeat the current track.
    Loop,
    /// Jump to a random track from the whole library.
    Shuffle,
}

impl PlayMode {
    /// The mode-button transition table.
    pub fn cycle(self) -> Self {
        match self {
            Self::Sequential => Self::Loop,
            Self::Loop => Self::Shuffle,
            Self::Shuffle => Self::Sequential,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sequential => "Sequential",
            Self::Loop => "Loop",
            Self::Shuffle => "Shuffle",
        }
    }
}

/// The session play mode, shared between the presentation context, the
/// playback controller and any sequencer run.
pub type SharedMode = Arc<Mutex<PlayMode>>;

#[derive(Debug)]
pub enum PlayerCmd {
    /// Load and play a track. `started` (when present) is acked once the
    /// backend accepted or refused the load, so a sequencer can wait with
    /// a bounded timeout for the track to actually start.
    Play {
        path: PathBuf,
        total: Option<Duration>,
        from_sequencer: bool,
        started: Option<Sender<bool>>,
    },
    /// Pause when playing, resume when paused.
    TogglePause,
    /// Stop playback and clear the current track.
    Stop,
    /// Seek to an absolute position in seconds (clamped to the track).
    SeekTo(f64),
    /// Set the output volume, `0.0..=1.0`.
    SetVolume(f32),
    /// A sequencer run ended naturally; clear state if its last track is
    /// still the current one.
    RunFinished { last: Option<PathBuf> },
    /// Shut the playback thread down.
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// A track started playing.
    NowPlaying { path: PathBuf },
    /// The current track reached its natural end and nothing else is
    /// driving playback; the consumer decides what plays next. Emitted at
    /// most once per finish.
    TrackFinished { path: PathBuf },
    /// Playback stopped and the session has no current track.
    Stopped,
    /// The backend refused the track and every fallback was exhausted.
    PlaybackError { path: PathBuf },
}

/// Snapshot of playback state shared with the presentation context and the
/// sequencer's wait loop. Refreshed by the playback thread on every tick
/// and after every command.
#[derive(Debug, Clone, Default)]
pub struct PlaybackInfo {
    pub path: Option<PathBuf>,
    /// Elapsed time from the manual clock, clamped to the track length.
    pub elapsed: Duration,
    pub total: Option<Duration>,
    pub playing: bool,
    pub paused: bool,
    /// Whether the backend still has audio queued for the current track.
    pub busy: bool,
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;
