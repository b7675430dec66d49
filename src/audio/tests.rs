use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::backend::AudioBackend;
use super::*;

#[derive(Debug, Default)]
struct MockState {
    busy: bool,
    paused: bool,
    load_ok: bool,
    unpause_supported: bool,
    native_seek: bool,
    loaded: Vec<PathBuf>,
    seeks: Vec<f64>,
    volume: f32,
}

/// Scripted backend: tests flip `busy` to simulate a track ending and
/// inspect the recorded calls.
#[derive(Clone)]
struct MockBackend(Arc<Mutex<MockState>>);

impl MockBackend {
    fn new() -> (Self, Arc<Mutex<MockState>>) {
        let state = Arc::new(Mutex::new(MockState {
            busy: false,
            paused: false,
            load_ok: true,
            unpause_supported: true,
            native_seek: true,
            loaded: Vec::new(),
            seeks: Vec::new(),
            volume: 1.0,
        }));
        (Self(state.clone()), state)
    }
}

impl AudioBackend for MockBackend {
    fn init(&mut self) -> bool {
        true
    }

    fn load_and_play(&mut self, path: &Path) -> bool {
        let mut s = self.0.lock().unwrap();
        if !s.load_ok {
            return false;
        }
        s.loaded.push(path.to_path_buf());
        s.busy = true;
        s.paused = false;
        true
    }

    fn pause(&mut self) {
        self.0.lock().unwrap().paused = true;
    }

    fn unpause(&mut self) -> bool {
        let mut s = self.0.lock().unwrap();
        if s.unpause_supported {
            s.paused = false;
            true
        } else {
            false
        }
    }

    fn stop(&mut self) {
        let mut s = self.0.lock().unwrap();
        s.busy = false;
        s.paused = false;
    }

    fn is_busy(&self) -> bool {
        self.0.lock().unwrap().busy
    }

    fn position_ms(&self) -> u64 {
        0
    }

    fn set_volume(&mut self, volume: f32) {
        self.0.lock().unwrap().volume = volume;
    }

    fn seek_set_position(&mut self, seconds: f64) -> bool {
        let mut s = self.0.lock().unwrap();
        if s.native_seek {
            s.seeks.push(seconds);
            true
        } else {
            false
        }
    }

    fn seek_from_start(&mut self, seconds: f64) -> bool {
        self.0.lock().unwrap().seeks.push(seconds);
        true
    }
}

fn shared_mode(mode: PlayMode) -> SharedMode {
    Arc::new(Mutex::new(mode))
}

fn track(name: &str) -> PathBuf {
    PathBuf::from(format!("/nonexistent/{name}"))
}

/// Receive the next `NowPlaying` path, skipping unrelated events.
fn next_now_playing(rx: &Receiver<PlayerEvent>) -> PathBuf {
    loop {
        match rx.recv_timeout(Duration::from_secs(3)).expect("no event") {
            PlayerEvent::NowPlaying { path } => return path,
            _ => continue,
        }
    }
}

fn finish_current(state: &Arc<Mutex<MockState>>) {
    state.lock().unwrap().busy = false;
}

mod order {
    use super::*;

    #[test]
    fn sequential_with_start_index_rotates_and_keeps_rotation() {
        let mut rng = rand::rng();
        let first = make_order(3, PlayMode::Sequential, Some(1), true, &mut rng);
        assert_eq!(first, vec![1, 2, 0]);
        // Later cycles keep the circular order continuous: B C A B C A ...
        let later = make_order(3, PlayMode::Sequential, Some(1), false, &mut rng);
        assert_eq!(later, vec![1, 2, 0]);
    }

    #[test]
    fn sequential_without_start_index_is_identity() {
        let mut rng = rand::rng();
        assert_eq!(
            make_order(4, PlayMode::Sequential, None, true, &mut rng),
            vec![0, 1, 2, 3]
        );
        assert_eq!(make_order(0, PlayMode::Sequential, None, true, &mut rng), Vec::<usize>::new());
    }

    #[test]
    fn shuffle_first_cycle_puts_start_track_first() {
        let mut rng = rand::rng();
        for _ in 0..20 {
            let order = make_order(6, PlayMode::Shuffle, Some(3), true, &mut rng);
            assert_eq!(order[0], 3);
            let mut sorted = order.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2, 3, 4, 5]);
        }
    }

    #[test]
    fn shuffle_later_cycles_are_full_permutations() {
        let mut rng = rand::rng();
        let order = make_order(5, PlayMode::Shuffle, Some(2), false, &mut rng);
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn out_of_range_start_index_is_ignored() {
        let mut rng = rand::rng();
        assert_eq!(
            make_order(3, PlayMode::Sequential, Some(9), true, &mut rng),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn play_mode_cycles_through_all_three() {
        let mut mode = PlayMode::Sequential;
        mode = mode.cycle();
        assert_eq!(mode, PlayMode::Loop);
        mode = mode.cycle();
        assert_eq!(mode, PlayMode::Shuffle);
        mode = mode.cycle();
        assert_eq!(mode, PlayMode::Sequential);
    }
}

mod controller {
    use super::*;

    #[test]
    fn natural_finish_emits_track_finished_exactly_once() {
        let (backend, state) = MockBackend::new();
        let (player, events) = Player::new(Box::new(backend), shared_mode(PlayMode::Sequential));

        player
            .send(PlayerCmd::Play {
                path: track("a.mp3"),
                total: Some(Duration::from_secs(10)),
                from_sequencer: false,
                started: None,
            })
            .unwrap();
        assert_eq!(next_now_playing(&events), track("a.mp3"));

        finish_current(&state);
        let finished = loop {
            match events.recv_timeout(Duration::from_secs(3)).expect("no finish") {
                PlayerEvent::TrackFinished { path } => break path,
                _ => continue,
            }
        };
        assert_eq!(finished, track("a.mp3"));

        // No second emission while the state stays finished.
        let mut again = false;
        while let Ok(ev) = events.recv_timeout(Duration::from_millis(600)) {
            if matches!(ev, PlayerEvent::TrackFinished { .. }) {
                again = true;
            }
        }
        assert!(!again, "TrackFinished emitted twice for one finish");

        player.shutdown();
    }

    #[test]
    fn loop_mode_restarts_same_track_without_finish_event() {
        let (backend, state) = MockBackend::new();
        let (player, events) = Player::new(Box::new(backend), shared_mode(PlayMode::Loop));

        player
            .send(PlayerCmd::Play {
                path: track("loop.mp3"),
                total: Some(Duration::from_secs(10)),
                from_sequencer: false,
                started: None,
            })
            .unwrap();
        assert_eq!(next_now_playing(&events), track("loop.mp3"));

        finish_current(&state);
        // The controller restarts the track itself.
        assert_eq!(next_now_playing(&events), track("loop.mp3"));
        assert!(state.lock().unwrap().busy);
        assert_eq!(state.lock().unwrap().loaded.len(), 2);

        player.shutdown();
    }

    #[test]
    fn pause_resume_keeps_elapsed_continuous() {
        let (backend, _state) = MockBackend::new();
        let (player, events) = Player::new(Box::new(backend), shared_mode(PlayMode::Sequential));
        let info = player.info_handle();

        player
            .send(PlayerCmd::Play {
                path: track("a.mp3"),
                total: Some(Duration::from_secs(100)),
                from_sequencer: false,
                started: None,
            })
            .unwrap();
        next_now_playing(&events);

        thread::sleep(Duration::from_millis(120));
        player.send(PlayerCmd::TogglePause).unwrap();
        thread::sleep(Duration::from_millis(350));
        let before = info.lock().unwrap().elapsed;
        assert!(info.lock().unwrap().paused);

        player.send(PlayerCmd::TogglePause).unwrap();
        thread::sleep(Duration::from_millis(250));
        let snapshot = info.lock().unwrap().clone();
        assert!(!snapshot.paused);
        // Continuous across the pause: resumed elapsed only grows by the
        // time since resume, never by the paused interval.
        assert!(
            snapshot.elapsed >= before && snapshot.elapsed < before + Duration::from_millis(330),
            "before {before:?}, after {:?}",
            snapshot.elapsed
        );

        player.shutdown();
    }

    #[test]
    fn resume_without_native_unpause_restarts_and_seeks_to_pause_point() {
        let (backend, state) = MockBackend::new();
        state.lock().unwrap().unpause_supported = false;
        let (player, events) = Player::new(Box::new(backend), shared_mode(PlayMode::Sequential));
        let info = player.info_handle();

        player
            .send(PlayerCmd::Play {
                path: track("a.mp3"),
                total: Some(Duration::from_secs(100)),
                from_sequencer: false,
                started: None,
            })
            .unwrap();
        next_now_playing(&events);

        thread::sleep(Duration::from_millis(150));
        player.send(PlayerCmd::TogglePause).unwrap();
        thread::sleep(Duration::from_millis(100));
        let paused_at = info.lock().unwrap().elapsed;

        player.send(PlayerCmd::TogglePause).unwrap();
        thread::sleep(Duration::from_millis(100));

        let s = state.lock().unwrap();
        assert_eq!(s.loaded.len(), 2, "fallback must restart the stream");
        let sought = *s.seeks.last().expect("fallback must seek");
        assert!(
            (sought - paused_at.as_secs_f64()).abs() < 0.3,
            "sought {sought}, paused at {paused_at:?}"
        );
        drop(s);

        player.shutdown();
    }

    #[test]
    fn seek_clamps_to_track_bounds() {
        let (backend, state) = MockBackend::new();
        let (player, events) = Player::new(Box::new(backend), shared_mode(PlayMode::Sequential));
        let info = player.info_handle();

        player
            .send(PlayerCmd::Play {
                path: track("a.mp3"),
                total: Some(Duration::from_secs(10)),
                from_sequencer: false,
                started: None,
            })
            .unwrap();
        next_now_playing(&events);

        player.send(PlayerCmd::SeekTo(-5.0)).unwrap();
        thread::sleep(Duration::from_millis(80));
        {
            let s = state.lock().unwrap();
            assert_eq!(*s.seeks.last().unwrap(), 0.0);
        }
        assert!(info.lock().unwrap().elapsed < Duration::from_millis(300));

        player.send(PlayerCmd::SeekTo(110.0)).unwrap();
        thread::sleep(Duration::from_millis(80));
        {
            let s = state.lock().unwrap();
            assert_eq!(*s.seeks.last().unwrap(), 10.0);
        }
        assert_eq!(info.lock().unwrap().elapsed, Duration::from_secs(10));

        player.shutdown();
    }

    #[test]
    fn seek_falls_back_when_native_seek_is_unsupported() {
        let (backend, state) = MockBackend::new();
        state.lock().unwrap().native_seek = false;
        let (player, events) = Player::new(Box::new(backend), shared_mode(PlayMode::Sequential));

        player
            .send(PlayerCmd::Play {
                path: track("a.mp3"),
                total: Some(Duration::from_secs(60)),
                from_sequencer: false,
                started: None,
            })
            .unwrap();
        next_now_playing(&events);

        player.send(PlayerCmd::SeekTo(30.0)).unwrap();
        thread::sleep(Duration::from_millis(80));
        // seek_from_start recorded it even though try-seek failed.
        assert_eq!(*state.lock().unwrap().seeks.last().unwrap(), 30.0);

        player.shutdown();
    }

    #[test]
    fn refused_load_surfaces_playback_error() {
        let (backend, state) = MockBackend::new();
        state.lock().unwrap().load_ok = false;
        let (player, events) = Player::new(Box::new(backend), shared_mode(PlayMode::Sequential));

        player
            .send(PlayerCmd::Play {
                path: track("broken.mp3"),
                total: None,
                from_sequencer: false,
                started: None,
            })
            .unwrap();
        let ev = events.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(
            ev,
            PlayerEvent::PlaybackError {
                path: track("broken.mp3")
            }
        );

        player.shutdown();
    }

    #[test]
    fn stop_clears_position_and_track() {
        let (backend, _state) = MockBackend::new();
        let (player, events) = Player::new(Box::new(backend), shared_mode(PlayMode::Sequential));
        let info = player.info_handle();

        player
            .send(PlayerCmd::Play {
                path: track("a.mp3"),
                total: Some(Duration::from_secs(10)),
                from_sequencer: false,
                started: None,
            })
            .unwrap();
        next_now_playing(&events);

        player.send(PlayerCmd::Stop).unwrap();
        thread::sleep(Duration::from_millis(80));
        let snapshot = info.lock().unwrap().clone();
        assert_eq!(snapshot.path, None);
        assert_eq!(snapshot.elapsed, Duration::ZERO);
        assert!(!snapshot.playing);

        player.shutdown();
    }
}

mod runs {
    use super::*;

    fn start_player(mode: PlayMode) -> (Player, Receiver<PlayerEvent>, Arc<Mutex<MockState>>, SharedMode) {
        let (backend, state) = MockBackend::new();
        let mode = shared_mode(mode);
        let (player, events) = Player::new(Box::new(backend), mode.clone());
        (player, events, state, mode)
    }

    #[test]
    fn sequential_run_with_start_index_wraps_in_rotated_order() {
        let (player, events, state, mode) = start_player(PlayMode::Sequential);
        let tracks = vec![track("a.mp3"), track("b.mp3"), track("c.mp3")];

        let run = spawn_run(
            player.sender(),
            player.info_handle(),
            mode,
            tracks.clone(),
            Some(1),
            true,
        );

        // B C A, then wrapping around to B again.
        for expected in ["b.mp3", "c.mp3", "a.mp3", "b.mp3"] {
            assert_eq!(next_now_playing(&events), track(expected));
            finish_current(&state);
        }

        run.cancel();
        player.shutdown();
    }

    #[test]
    fn skip_advances_immediately_without_natural_finish() {
        let (player, events, state, mode) = start_player(PlayMode::Sequential);
        let tracks = vec![track("a.mp3"), track("b.mp3")];

        let run = spawn_run(
            player.sender(),
            player.info_handle(),
            mode,
            tracks,
            None,
            false,
        );

        assert_eq!(next_now_playing(&events), track("a.mp3"));
        // Track A keeps "playing" (busy stays true); skip must not wait for it.
        run.request_skip();
        assert_eq!(next_now_playing(&events), track("b.mp3"));

        // Natural end of the last track closes the run and the session.
        finish_current(&state);
        let stopped = loop {
            match events.recv_timeout(Duration::from_secs(3)).expect("no event") {
                PlayerEvent::Stopped => break true,
                PlayerEvent::NowPlaying { .. } => break false,
                _ => continue,
            }
        };
        assert!(stopped, "run end must drop the session to not-playing");
        assert!(player.info_handle().lock().unwrap().path.is_none());

        player.shutdown();
    }

    #[test]
    fn cancelled_run_starts_no_further_tracks() {
        let (player, events, state, mode) = start_player(PlayMode::Sequential);
        let tracks = vec![track("a.mp3"), track("b.mp3"), track("c.mp3")];

        let run = spawn_run(
            player.sender(),
            player.info_handle(),
            mode,
            tracks,
            None,
            true,
        );
        assert_eq!(next_now_playing(&events), track("a.mp3"));

        run.cancel();
        finish_current(&state);

        // Nothing new starts once the flag is observed.
        let mut started_again = false;
        while let Ok(ev) = events.recv_timeout(Duration::from_millis(700)) {
            if matches!(ev, PlayerEvent::NowPlaying { .. }) {
                started_again = true;
            }
        }
        assert!(!started_again, "a track started after cancellation");
        assert!(!run.is_active());

        player.shutdown();
    }

    #[test]
    fn shuffle_run_first_cycle_starts_at_requested_track() {
        let (player, events, state, mode) = start_player(PlayMode::Shuffle);
        let tracks = vec![
            track("a.mp3"),
            track("b.mp3"),
            track("c.mp3"),
            track("d.mp3"),
        ];

        let run = spawn_run(
            player.sender(),
            player.info_handle(),
            mode,
            tracks.clone(),
            Some(2),
            false,
        );

        assert_eq!(next_now_playing(&events), track("c.mp3"));
        let mut seen = vec![track("c.mp3")];
        for _ in 0..3 {
            finish_current(&state);
            seen.push(next_now_playing(&events));
        }
        finish_current(&state);

        let mut sorted = seen.clone();
        sorted.sort();
        let mut expected = tracks.clone();
        expected.sort();
        assert_eq!(sorted, expected, "each track plays exactly once: {seen:?}");

        run.cancel();
        player.shutdown();
    }

    #[test]
    fn new_run_supersedes_old_one() {
        let (player, events, state, mode) = start_player(PlayMode::Sequential);

        let old = spawn_run(
            player.sender(),
            player.info_handle(),
            mode.clone(),
            vec![track("old-1.mp3"), track("old-2.mp3")],
            None,
            true,
        );
        assert_eq!(next_now_playing(&events), track("old-1.mp3"));

        // The caller cancels the old run before starting the new one.
        old.cancel();
        let new = spawn_run(
            player.sender(),
            player.info_handle(),
            mode,
            vec![track("new-1.mp3"), track("new-2.mp3")],
            None,
            true,
        );
        assert_eq!(next_now_playing(&events), track("new-1.mp3"));

        // Finishing a track only ever advances within the new list.
        finish_current(&state);
        assert_eq!(next_now_playing(&events), track("new-2.mp3"));

        new.cancel();
        player.shutdown();
    }
}
