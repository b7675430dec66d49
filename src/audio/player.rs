//! Playback controller.
//!
//! A dedicated thread owns the audio backend, the manual clock and the
//! "now playing" track. Everything else talks to it through `PlayerCmd`
//! messages and reads back a shared `PlaybackInfo` snapshot plus a
//! `PlayerEvent` stream, so playback state is never mutated from two
//! contexts at once.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use crate::library;

use super::backend::AudioBackend;
use super::clock::PlaybackClock;
use super::types::{
    PlayMode, PlaybackHandle, PlaybackInfo, PlayerCmd, PlayerEvent, SharedMode,
};

/// Position-poll cadence. Commands interrupt the wait, so every state
/// change also restarts the timer and refreshes the snapshot immediately.
const TICK: Duration = Duration::from_millis(500);

pub struct Player {
    tx: Sender<PlayerCmd>,
    info: PlaybackHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Player {
    /// Spawn the playback thread around `backend`. Returns the handle and
    /// the event stream for the presentation context.
    pub fn new(backend: Box<dyn AudioBackend>, mode: SharedMode) -> (Self, Receiver<PlayerEvent>) {
        let (tx, rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let info: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo::default()));

        let join = spawn_player_thread(backend, mode, rx, event_tx, info.clone());
        (
            Self {
                tx,
                info,
                join: Mutex::new(Some(join)),
            },
            event_rx,
        )
    }

    pub fn send(&self, cmd: PlayerCmd) -> Result<(), mpsc::SendError<PlayerCmd>> {
        self.tx.send(cmd)
    }

    /// A cloneable command sender for background tasks (the sequencer).
    pub fn sender(&self) -> Sender<PlayerCmd> {
        self.tx.clone()
    }

    pub fn info_handle(&self) -> PlaybackHandle {
        self.info.clone()
    }

    /// Stop playback and wait for the thread to exit.
    pub fn shutdown(&self) {
        let _ = self.send(PlayerCmd::Quit);
        if let Ok(mut join) = self.join.lock() {
            if let Some(handle) = join.take() {
                let _ = handle.join();
            }
        }
    }
}

fn spawn_player_thread(
    backend: Box<dyn AudioBackend>,
    mode: SharedMode,
    rx: Receiver<PlayerCmd>,
    events: Sender<PlayerEvent>,
    info: PlaybackHandle,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut state = PlayerState {
            backend,
            mode,
            events,
            info,
            clock: PlaybackClock::new(),
            current: None,
            in_run: false,
            finish_emitted: false,
        };
        loop {
            match rx.recv_timeout(TICK) {
                Ok(cmd) => {
                    if state.handle(cmd) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => state.tick(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}

struct CurrentTrack {
    path: PathBuf,
    total: Option<Duration>,
}

struct PlayerState {
    backend: Box<dyn AudioBackend>,
    mode: SharedMode,
    events: Sender<PlayerEvent>,
    info: PlaybackHandle,
    clock: PlaybackClock,
    current: Option<CurrentTrack>,
    /// Whether a sequencer run owns end-of-track advancement.
    in_run: bool,
    /// Guards the one-shot `TrackFinished` event per natural finish.
    finish_emitted: bool,
}

impl PlayerState {
    /// Returns `true` when the thread should exit.
    fn handle(&mut self, cmd: PlayerCmd) -> bool {
        match cmd {
            PlayerCmd::Play {
                path,
                total,
                from_sequencer,
                started,
            } => {
                let ok = self.play(path, total, from_sequencer);
                if let Some(ack) = started {
                    let _ = ack.send(ok);
                }
            }
            PlayerCmd::TogglePause => self.toggle_pause(),
            PlayerCmd::Stop => self.stop(),
            PlayerCmd::SeekTo(seconds) => self.seek_to(seconds),
            PlayerCmd::SetVolume(volume) => self.backend.set_volume(volume.clamp(0.0, 1.0)),
            PlayerCmd::RunFinished { last } => {
                self.in_run = false;
                let still_current = match (&self.current, &last) {
                    (Some(current), Some(last)) => current.path == *last,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if still_current {
                    self.stop();
                }
            }
            PlayerCmd::Quit => {
                self.backend.stop();
                return true;
            }
        }
        false
    }

    fn play(&mut self, path: PathBuf, total: Option<Duration>, from_sequencer: bool) -> bool {
        if !self.backend.load_and_play(&path) {
            warn!("backend refused to load {}", path.display());
            self.current = None;
            self.clock.clear();
            self.publish();
            let _ = self.events.send(PlayerEvent::PlaybackError { path });
            return false;
        }

        // The clamp and the progress display need a length; probe once if
        // the caller did not know it.
        let total = total.or_else(|| library::ensure_duration(&path));
        self.clock.start();
        self.finish_emitted = false;
        self.in_run = from_sequencer;
        info!("playing {}", path.display());
        let _ = self.events.send(PlayerEvent::NowPlaying { path: path.clone() });
        self.current = Some(CurrentTrack { path, total });
        self.publish();
        true
    }

    fn toggle_pause(&mut self) {
        if self.current.is_none() {
            return;
        }
        if self.clock.is_paused() {
            if self.backend.unpause() {
                self.clock.resume();
            } else {
                // No in-place resume: restart the stream and seek back to the
                // position the pause froze the clock at.
                let position = self.clock.elapsed().unwrap_or_default();
                let path = self.current.as_ref().map(|c| c.path.clone());
                if let Some(path) = path {
                    if self.backend.load_and_play(&path) {
                        self.seek_to(position.as_secs_f64());
                    } else {
                        warn!("resume fallback failed for {}", path.display());
                        let _ = self.events.send(PlayerEvent::PlaybackError { path });
                        self.stop();
                        return;
                    }
                }
            }
        } else if self.clock.is_running() {
            self.backend.pause();
            self.clock.pause();
        }
        self.publish();
    }

    fn seek_to(&mut self, target: f64) {
        let Some(current) = &self.current else {
            return;
        };
        let mut target = target.max(0.0);
        if let Some(total) = current.total {
            target = target.min(total.as_secs_f64());
        }
        let path = current.path.clone();

        // Native seek, then play-from-offset, then a full restart.
        let sought = self.backend.seek_set_position(target)
            || self.backend.seek_from_start(target)
            || (self.backend.load_and_play(&path) && self.backend.seek_from_start(target));
        if !sought {
            warn!("all seek fallbacks failed for {}", path.display());
        }

        // The manual clock is authoritative either way.
        self.clock.seek_to(Duration::from_secs_f64(target));
        self.finish_emitted = false;
        self.publish();
    }

    fn stop(&mut self) {
        self.backend.stop();
        self.current = None;
        self.clock.clear();
        self.in_run = false;
        self.finish_emitted = false;
        self.publish();
        let _ = self.events.send(PlayerEvent::Stopped);
    }

    /// Periodic position refresh and natural-finish detection.
    fn tick(&mut self) {
        let finished = self.current.is_some() && !self.clock.is_paused() && !self.backend.is_busy();
        if finished {
            if self.in_run {
                // The sequencer's wait loop sees busy=false and advances.
                self.publish();
                return;
            }
            let looping = self
                .mode
                .lock()
                .map(|mode| *mode == PlayMode::Loop)
                .unwrap_or(false);
            if looping {
                let restart = self
                    .current
                    .as_ref()
                    .map(|c| (c.path.clone(), c.total));
                if let Some((path, total)) = restart {
                    if !self.play(path, total, false) {
                        self.stop();
                    }
                }
                return;
            }
            if !self.finish_emitted {
                self.finish_emitted = true;
                if let Some(current) = &self.current {
                    let _ = self.events.send(PlayerEvent::TrackFinished {
                        path: current.path.clone(),
                    });
                }
            }
        }
        self.publish();
    }

    /// Refresh the shared snapshot.
    fn publish(&self) {
        if let Ok(mut info) = self.info.lock() {
            let busy = self.backend.is_busy();
            let paused = self.clock.is_paused();
            info.path = self.current.as_ref().map(|c| c.path.clone());
            info.total = self.current.as_ref().and_then(|c| c.total);
            info.elapsed = self.position();
            info.paused = paused;
            info.busy = busy;
            info.playing = self.current.is_some() && !paused && busy;
        }
    }

    fn position(&self) -> Duration {
        let total = self.current.as_ref().and_then(|c| c.total);
        match self.clock.elapsed_clamped(total) {
            Some(elapsed) => elapsed,
            // No anchor: the backend's own query is the last resort.
            None => Duration::from_millis(self.backend.position_ms()),
        }
    }
}
