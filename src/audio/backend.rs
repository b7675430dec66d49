//! Audio backend adapter.
//!
//! The playback controller only ever talks to this narrow contract; the
//! rodio implementation below is the real engine. Seeking has a native
//! path (`try_seek`) and a rebuild path (`skip_duration` from the start)
//! because not every decoder can seek in place.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::warn;

pub trait AudioBackend: Send {
    /// Bring the output device up. Safe to call more than once.
    fn init(&mut self) -> bool;
    /// Load `path` and start playing from the top. `false` on any failure.
    fn load_and_play(&mut self, path: &Path) -> bool;
    fn pause(&mut self);
    /// Resume the paused stream in place; `false` when unsupported.
    fn unpause(&mut self) -> bool;
    fn stop(&mut self);
    /// Whether audio is still queued for the current stream.
    fn is_busy(&self) -> bool;
    /// Best-effort stream position; unreliable across pause and seek.
    fn position_ms(&self) -> u64;
    fn set_volume(&mut self, volume: f32);
    /// Native in-place seek; `false` when the source cannot seek.
    fn seek_set_position(&mut self, seconds: f64) -> bool;
    /// Rebuild the stream, skipping `seconds` from the start.
    fn seek_from_start(&mut self, seconds: f64) -> bool;
}

pub struct RodioBackend {
    stream: Option<OutputStream>,
    sink: Option<Sink>,
    current: Option<PathBuf>,
    volume: f32,
}

impl RodioBackend {
    pub fn new() -> Self {
        Self {
            stream: None,
            sink: None,
            current: None,
            volume: 1.0,
        }
    }

    /// Open a paused sink for `path` starting `start_at` into the stream.
    fn open_sink_at(&self, path: &Path, start_at: Duration) -> Option<Sink> {
        let stream = self.stream.as_ref()?;
        let file = File::open(path)
            .map_err(|e| warn!("failed to open {}: {e}", path.display()))
            .ok()?;
        let source = Decoder::new(BufReader::new(file))
            .map_err(|e| warn!("failed to decode {}: {e}", path.display()))
            .ok()?
            .skip_duration(start_at);

        let sink = Sink::connect_new(stream.mixer());
        sink.set_volume(self.volume);
        sink.append(source);
        sink.pause();
        Some(sink)
    }
}

impl Default for RodioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for RodioBackend {
    fn init(&mut self) -> bool {
        if self.stream.is_some() {
            return true;
        }
        match OutputStreamBuilder::open_default_stream() {
            Ok(mut stream) => {
                // rodio logs to stderr when the stream drops; noisy under a TUI.
                stream.log_on_drop(false);
                self.stream = Some(stream);
                true
            }
            Err(e) => {
                warn!("audio output unavailable: {e}");
                false
            }
        }
    }

    fn load_and_play(&mut self, path: &Path) -> bool {
        if self.stream.is_none() && !self.init() {
            return false;
        }
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        let Some(sink) = self.open_sink_at(path, Duration::ZERO) else {
            self.current = None;
            return false;
        };
        sink.play();
        self.sink = Some(sink);
        self.current = Some(path.to_path_buf());
        true
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn unpause(&mut self) -> bool {
        match &self.sink {
            Some(sink) => {
                sink.play();
                true
            }
            None => false,
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.current = None;
    }

    fn is_busy(&self) -> bool {
        self.sink.as_ref().map(|s| !s.empty()).unwrap_or(false)
    }

    fn position_ms(&self) -> u64 {
        self.sink
            .as_ref()
            .map(|s| s.get_pos().as_millis() as u64)
            .unwrap_or(0)
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(sink) = &self.sink {
            sink.set_volume(volume);
        }
    }

    fn seek_set_position(&mut self, seconds: f64) -> bool {
        match &self.sink {
            Some(sink) => sink.try_seek(Duration::from_secs_f64(seconds.max(0.0))).is_ok(),
            None => false,
        }
    }

    fn seek_from_start(&mut self, seconds: f64) -> bool {
        let Some(path) = self.current.clone() else {
            return false;
        };
        let was_paused = self.sink.as_ref().map(|s| s.is_paused()).unwrap_or(false);
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        let Some(sink) = self.open_sink_at(&path, Duration::from_secs_f64(seconds.max(0.0))) else {
            return false;
        };
        if !was_paused {
            sink.play();
        }
        self.sink = Some(sink);
        true
    }
}
