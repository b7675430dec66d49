//! Manual wall-clock playback timing.
//!
//! The audio backend's own position query is not pause-aware, so elapsed
//! time is derived from an anchor instant instead: a segment start plus the
//! time accumulated before it. Pausing freezes the value, resuming and
//! seeking re-anchor it.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    /// Instant the current segment began; `None` while no stream is loaded.
    anchor: Option<Instant>,
    /// Elapsed time accumulated before `anchor` (from seeks and resumes).
    base: Duration,
    /// Set while paused; freezes `elapsed` at that instant.
    paused_at: Option<Instant>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor at "now"; elapsed restarts from zero.
    pub fn start(&mut self) {
        self.anchor = Some(Instant::now());
        self.base = Duration::ZERO;
        self.paused_at = None;
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.base = Duration::ZERO;
        self.paused_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Record the pause timestamp, freezing `elapsed`. No-op unless the
    /// clock is running and not already paused.
    pub fn pause(&mut self) {
        if self.anchor.is_some() && self.paused_at.is_none() {
            self.paused_at = Some(Instant::now());
        }
    }

    /// Fold the frozen elapsed into the base and re-anchor, so elapsed is
    /// continuous across the pause.
    pub fn resume(&mut self) {
        if self.paused_at.is_some() {
            if let Some(frozen) = self.elapsed() {
                self.base = frozen;
                self.anchor = Some(Instant::now());
                self.paused_at = None;
            }
        }
    }

    /// Re-anchor so `elapsed` equals `position`, clearing any pause.
    pub fn seek_to(&mut self, position: Duration) {
        self.base = position;
        self.anchor = Some(Instant::now());
        self.paused_at = None;
    }

    /// Elapsed playback time; `None` when no stream is anchored.
    pub fn elapsed(&self) -> Option<Duration> {
        let anchor = self.anchor?;
        let segment = match self.paused_at {
            Some(paused_at) => paused_at.saturating_duration_since(anchor),
            None => anchor.elapsed(),
        };
        Some(self.base + segment)
    }

    /// Elapsed clamped to `[0, total]` when the track length is known.
    pub fn elapsed_clamped(&self, total: Option<Duration>) -> Option<Duration> {
        let elapsed = self.elapsed()?;
        Some(match total {
            Some(total) if elapsed > total => total,
            _ => elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const TOLERANCE: Duration = Duration::from_millis(40);

    fn roughly(a: Duration, b: Duration) -> bool {
        let diff = if a > b { a - b } else { b - a };
        diff <= TOLERANCE
    }

    #[test]
    fn elapsed_is_none_until_started() {
        let clock = PlaybackClock::new();
        assert_eq!(clock.elapsed(), None);
        assert!(!clock.is_running());
    }

    #[test]
    fn elapsed_tracks_wall_clock() {
        let mut clock = PlaybackClock::new();
        clock.start();
        sleep(Duration::from_millis(60));
        let e = clock.elapsed().unwrap();
        assert!(roughly(e, Duration::from_millis(60)), "elapsed {e:?}");
    }

    #[test]
    fn elapsed_is_continuous_across_pause_and_resume() {
        let mut clock = PlaybackClock::new();
        clock.start();
        sleep(Duration::from_millis(60));

        clock.pause();
        let before = clock.elapsed().unwrap();
        sleep(Duration::from_millis(80));
        // Frozen while paused.
        assert_eq!(clock.elapsed().unwrap(), before);

        clock.resume();
        let after = clock.elapsed().unwrap();
        assert!(roughly(after, before), "before {before:?} after {after:?}");

        sleep(Duration::from_millis(50));
        let later = clock.elapsed().unwrap();
        assert!(
            roughly(later, before + Duration::from_millis(50)),
            "later {later:?}"
        );
    }

    #[test]
    fn seek_re_anchors_and_clears_pause() {
        let mut clock = PlaybackClock::new();
        clock.start();
        clock.pause();
        clock.seek_to(Duration::from_secs(30));
        assert!(!clock.is_paused());
        let e = clock.elapsed().unwrap();
        assert!(roughly(e, Duration::from_secs(30)), "elapsed {e:?}");
    }

    #[test]
    fn elapsed_clamps_to_known_total() {
        let mut clock = PlaybackClock::new();
        clock.start();
        clock.seek_to(Duration::from_secs(500));
        let total = Some(Duration::from_secs(120));
        assert_eq!(clock.elapsed_clamped(total), Some(Duration::from_secs(120)));
        // Unknown total: no clamp.
        let raw = clock.elapsed_clamped(None).unwrap();
        assert!(raw >= Duration::from_secs(500));
    }
}
