//! Ordered playback of a track list.
//!
//! A run executes on its own thread, telling the playback controller which
//! track to start and then polling a shared snapshot for the end of that
//! track. Only flags cross the boundary: cancellation aborts the whole
//! run, a skip request drops the current track, and pause simply suspends
//! the wait. At most one run is active; starting another cancels it.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use super::types::{PlayMode, PlaybackHandle, PlayerCmd, SharedMode};

/// Bounded wait for the controller to ack that a track started, so an
/// unresponsive player cannot stall the run forever.
const START_TIMEOUT: Duration = Duration::from_secs(2);
const FINISH_POLL: Duration = Duration::from_millis(200);
const PAUSE_POLL: Duration = Duration::from_millis(100);

/// Build one cycle's play order as indices into the track list.
///
/// Sequential playback with a start index rotates the list so it begins
/// there and wraps to the list's start, keeping that rotation on later
/// cycles so the circular order stays continuous. Shuffle plays the start
/// track first and permutes the rest on the first cycle, then draws a
/// fresh permutation per cycle. Loop repeats happen in the controller,
/// not here, so that mode gets plain sequential list order.
pub fn make_order<R: Rng + ?Sized>(
    len: usize,
    mode: PlayMode,
    start_index: Option<usize>,
    first_cycle: bool,
    rng: &mut R,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    match mode {
        PlayMode::Shuffle => match start_index {
            Some(start) if first_cycle && start < len => {
                order.remove(start);
                order.shuffle(rng);
                order.insert(0, start);
            }
            _ => order.shuffle(rng),
        },
        PlayMode::Sequential | PlayMode::Loop => {
            if let Some(start) = start_index {
                if start < len {
                    order.rotate_left(start);
                }
            }
        }
    }
    order
}

/// Control handle for one run.
pub struct RunHandle {
    cancelled: Arc<AtomicBool>,
    skip: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
}

impl RunHandle {
    /// Abort the run; the thread observes the flag and exits promptly.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Drop the current track and advance to the next in order.
    pub fn request_skip(&self) {
        self.skip.store(true, Ordering::Relaxed);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// Start playing `tracks` under the shared mode, optionally from
/// `start_index`. With `wrap` the run cycles until cancelled; without it
/// the run ends after one pass and the session drops back to "not
/// playing".
pub fn spawn_run(
    player: Sender<PlayerCmd>,
    info: PlaybackHandle,
    mode: SharedMode,
    tracks: Vec<PathBuf>,
    start_index: Option<usize>,
    wrap: bool,
) -> RunHandle {
    let cancelled = Arc::new(AtomicBool::new(false));
    let skip = Arc::new(AtomicBool::new(false));
    let active = Arc::new(AtomicBool::new(true));

    let handle = RunHandle {
        cancelled: cancelled.clone(),
        skip: skip.clone(),
        active: active.clone(),
    };
    thread::spawn(move || {
        run_loop(&player, &info, &mode, &tracks, start_index, wrap, &cancelled, &skip);
        active.store(false, Ordering::Relaxed);
    });
    handle
}

#[allow(clippy::too_many_arguments)]
fn run_loop(
    player: &Sender<PlayerCmd>,
    info: &PlaybackHandle,
    mode: &SharedMode,
    tracks: &[PathBuf],
    start_index: Option<usize>,
    wrap: bool,
    cancelled: &AtomicBool,
    skip: &AtomicBool,
) {
    if tracks.is_empty() {
        let _ = player.send(PlayerCmd::RunFinished { last: None });
        return;
    }

    let mut rng = rand::rng();
    let mut first_cycle = true;
    let mut last_started: Option<PathBuf> = None;

    'run: loop {
        let current_mode = mode.lock().map(|m| *m).unwrap_or_default();
        let order = make_order(tracks.len(), current_mode, start_index, first_cycle, &mut rng);

        for index in order {
            if cancelled.load(Ordering::Relaxed) {
                break 'run;
            }
            let path = tracks[index].clone();

            let (ack_tx, ack_rx) = mpsc::channel();
            if player
                .send(PlayerCmd::Play {
                    path: path.clone(),
                    total: None,
                    from_sequencer: true,
                    started: Some(ack_tx),
                })
                .is_err()
            {
                // Player thread is gone; nothing left to drive.
                return;
            }
            match ack_rx.recv_timeout(START_TIMEOUT) {
                Ok(true) => {}
                // Track failed to load; move on to the next one, paced so a
                // list of broken paths cannot spin the loop hot.
                Ok(false) => {
                    thread::sleep(FINISH_POLL);
                    continue;
                }
                Err(_) => debug!("no start ack for {}", path.display()),
            }
            last_started = Some(path);

            // Wait for the track to end, honoring cancel, skip and pause.
            loop {
                if cancelled.load(Ordering::Relaxed) {
                    break 'run;
                }
                // Skip wins over a concurrent natural finish, and is
                // consumed exactly once.
                if skip.swap(false, Ordering::Relaxed) {
                    let _ = player.send(PlayerCmd::Stop);
                    thread::sleep(Duration::from_millis(50));
                    break;
                }
                let Ok(snapshot) = info.lock().map(|i| (i.busy, i.paused)) else {
                    break;
                };
                let (busy, paused) = snapshot;
                if paused {
                    thread::sleep(PAUSE_POLL);
                    continue;
                }
                if !busy {
                    break;
                }
                thread::sleep(FINISH_POLL);
            }
        }

        if !wrap {
            break;
        }
        first_cycle = false;
    }

    if !cancelled.load(Ordering::Relaxed) {
        let _ = player.send(PlayerCmd::RunFinished { last: last_started });
    }
}
