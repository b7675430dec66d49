use std::path::Path;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use rand::seq::IndexedRandom;
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use crate::app::{App, Pane, PlaybackState};
use crate::audio::{PlayMode, Player, PlayerCmd, PlayerEvent, spawn_run};
use crate::config::Settings;
use crate::library::{Artwork, MetadataStore, ScanEvent, artwork_for};
use crate::playlist::PlaylistStore;
use crate::ui;

use super::Scanner;

/// Main terminal event loop: drains scanner and playback events into the
/// app model, draws, and handles input. All shared-state mutation happens
/// here, on this thread.
#[allow(clippy::too_many_arguments)]
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &Settings,
    app: &mut App,
    player: &Player,
    player_events: &Receiver<PlayerEvent>,
    playlists: &mut PlaylistStore,
    store: &MetadataStore,
    scanner: &mut Scanner,
    scan_rx: &Receiver<ScanEvent>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        drain_scan_events(app, store, scan_rx);
        drain_player_events(app, player, player_events);
        sync_playback_state(app);

        terminal.draw(|frame| ui::draw(frame, app, settings))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, player, playlists, store, scanner)? {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn drain_scan_events(app: &mut App, store: &MetadataStore, scan_rx: &Receiver<ScanEvent>) {
    while let Ok(event) = scan_rx.try_recv() {
        match event {
            ScanEvent::Discovered { track } => {
                app.index.upsert(track);
            }
            ScanEvent::Excluded { .. } => app.excluded += 1,
            ScanEvent::Failed { error } => {
                app.scanning = false;
                app.status = Some(error);
            }
            ScanEvent::Finished { found, excluded } => {
                app.scanning = false;
                app.excluded = excluded;
                info!("scan finished: {found} found, {excluded} excluded");
                store.save(&app.cache_snapshot());
            }
        }
    }
}

fn drain_player_events(app: &mut App, player: &Player, events: &Receiver<PlayerEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            PlayerEvent::NowPlaying { path } => {
                app.playback = PlaybackState::Playing;
                app.status = None;
                app.now_art = path
                    .parent()
                    .map(artwork_for)
                    .unwrap_or(Artwork::Placeholder);
                if let Some(index) = app.index.position_of(&path) {
                    app.set_selected(index);
                }
            }
            PlayerEvent::TrackFinished { path } => {
                advance_after(app, player, &path);
            }
            PlayerEvent::Stopped => {
                app.playback = PlaybackState::Stopped;
                app.now_art = Artwork::Placeholder;
            }
            PlayerEvent::PlaybackError { path } => {
                app.status = Some(format!("failed to play {}", path.display()));
            }
        }
    }
}

fn sync_playback_state(app: &mut App) {
    let Some(handle) = app.playback_handle.clone() else {
        return;
    };
    if let Ok(info) = handle.lock() {
        app.playback = if info.path.is_none() {
            PlaybackState::Stopped
        } else if info.paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        };
    }
}

/// End-of-track dispatch for session playback (no sequencer run): Shuffle
/// draws from the whole library, everything else advances through the
/// visible list and stops at its end. Loop never reaches here naturally
/// (the controller restarts the track itself), so a forced skip in Loop
/// mode advances sequentially.
fn advance_after(app: &mut App, player: &Player, finished: &Path) {
    match app.mode() {
        PlayMode::Shuffle => {
            let tracks = app.index.tracks();
            if tracks.is_empty() {
                return;
            }
            let mut candidates: Vec<usize> = (0..tracks.len())
                .filter(|&i| tracks[i].path != finished)
                .collect();
            if candidates.is_empty() {
                candidates = (0..tracks.len()).collect();
            }
            if let Some(&next) = candidates.choose(&mut rand::rng()) {
                play_index(app, player, next);
            }
        }
        PlayMode::Sequential | PlayMode::Loop => {
            let display = app.display_indices();
            let position = display.iter().position(|&i| {
                app.index
                    .get(i)
                    .map(|t| t.path == finished)
                    .unwrap_or(false)
            });
            match position {
                Some(p) if p + 1 < display.len() => play_index(app, player, display[p + 1]),
                // End of the visible list, or the track is no longer in it.
                _ => {
                    let _ = player.send(PlayerCmd::Stop);
                }
            }
        }
    }
}

fn play_index(app: &mut App, player: &Player, index: usize) {
    let Some((path, total)) = app.index.get(index).map(|t| (t.path.clone(), t.duration())) else {
        return;
    };
    app.set_selected(index);
    let _ = player.send(PlayerCmd::Play {
        path,
        total,
        from_sequencer: false,
        started: None,
    });
}

fn skip_track(app: &mut App, player: &Player) {
    if app.run_active() {
        // The run's wait loop consumes the flag and advances in order.
        if let Some(run) = &app.run {
            run.request_skip();
        }
        return;
    }
    let playing = app
        .playback_handle
        .as_ref()
        .and_then(|h| h.lock().ok().and_then(|info| info.path.clone()));
    if let Some(path) = playing {
        advance_after(app, player, &path);
    }
}

fn play_selected_playlist(app: &mut App, player: &Player, playlists: &PlaylistStore) {
    let Some(name) = app.selected_playlist() else {
        return;
    };
    let Some(playlist) = playlists.get(name) else {
        return;
    };
    let tracks: Vec<_> = playlist
        .tracks
        .iter()
        .map(std::path::PathBuf::from)
        .collect();

    info!("playing playlist {name} ({} tracks)", tracks.len());
    app.cancel_run();
    app.run = Some(spawn_run(
        player.sender(),
        player.info_handle(),
        app.mode.clone(),
        tracks,
        None,
        true,
    ));
}

fn restart_scan(app: &mut App, scanner: &mut Scanner) {
    // Carry the current stamps over so unchanged files skip extraction.
    let cached = app.cache_snapshot().meta_by_path();
    app.index.clear();
    app.selected = 0;
    app.excluded = 0;
    app.scanning = true;
    app.status = None;
    scanner.start(&app.songs_dir, app.min_duration, cached);
}

fn seek_by(app: &App, player: &Player, seconds: i64) {
    let snapshot = app
        .playback_handle
        .as_ref()
        .and_then(|h| h.lock().ok().map(|info| (info.path.is_some(), info.elapsed)));
    if let Some((true, elapsed)) = snapshot {
        let target = elapsed.as_secs_f64() + seconds as f64;
        let _ = player.send(PlayerCmd::SeekTo(target));
    }
}

fn set_volume(app: &mut App, player: &Player, delta: f32) {
    app.volume = (app.volume + delta).clamp(0.0, 1.0);
    let _ = player.send(PlayerCmd::SetVolume(app.volume));
}

/// Returns `Ok(true)` when the app should quit.
fn handle_key_event(
    key: KeyEvent,
    settings: &Settings,
    app: &mut App,
    player: &Player,
    playlists: &mut PlaylistStore,
    store: &MetadataStore,
    scanner: &mut Scanner,
) -> Result<bool, Box<dyn std::error::Error>> {
    // Playlist-name entry grabs the keyboard until confirmed or aborted.
    if app.name_input.is_some() {
        match key.code {
            KeyCode::Esc => app.name_input = None,
            KeyCode::Backspace => {
                if let Some(input) = app.name_input.as_mut() {
                    input.pop();
                }
            }
            KeyCode::Enter => {
                if let Some(input) = app.name_input.take() {
                    if playlists.create(&input) {
                        app.refresh_playlists(playlists);
                    }
                }
            }
            KeyCode::Char(c) if !c.is_control() => {
                if let Some(input) = app.name_input.as_mut() {
                    input.push(c);
                }
            }
            _ => {}
        }
        return Ok(false);
    }

    if app.filter_mode {
        match key.code {
            KeyCode::Esc => app.clear_filter(),
            KeyCode::Backspace => app.pop_filter_char(),
            KeyCode::Down => app.next(),
            KeyCode::Up => app.prev(),
            KeyCode::Enter => {
                if app.display_indices().is_empty() {
                    return Ok(false);
                }
                app.exit_filter_mode();
                app.cancel_run();
                play_index(app, player, app.selected);
            }
            KeyCode::Char(c) if !c.is_control() => app.push_filter_char(c),
            _ => {}
        }
        return Ok(false);
    }

    match key.code {
        KeyCode::Char('q') => {
            app.cancel_run();
            return Ok(true);
        }
        KeyCode::Char('/') => app.enter_filter_mode(),
        KeyCode::Tab => app.toggle_pane(),
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.prev(),
        KeyCode::Char('g') => {
            if let Some(&first) = app.display_indices().first() {
                app.set_selected(first);
            }
        }
        KeyCode::Char('G') => {
            if let Some(&last) = app.display_indices().last() {
                app.set_selected(last);
            }
        }
        KeyCode::Enter => match app.pane {
            Pane::Library => {
                if app.has_tracks() {
                    // A manual play supersedes any running playlist.
                    app.cancel_run();
                    play_index(app, player, app.selected);
                }
            }
            Pane::Playlists => play_selected_playlist(app, player, playlists),
        },
        KeyCode::Char(' ') | KeyCode::Char('p') => {
            let _ = player.send(PlayerCmd::TogglePause);
        }
        KeyCode::Char('n') => skip_track(app, player),
        KeyCode::Char('s') => {
            app.cancel_run();
            let _ = player.send(PlayerCmd::Stop);
        }
        KeyCode::Char('m') => {
            app.cycle_play_mode();
            // Mode survives restarts via the cache settings.
            store.save(&app.cache_snapshot());
        }
        KeyCode::Char('d') => {
            app.toggle_dark_mode();
            store.save(&app.cache_snapshot());
        }
        KeyCode::Char('H') => seek_by(app, player, -(settings.controls.scrub_seconds as i64)),
        KeyCode::Char('L') => seek_by(app, player, settings.controls.scrub_seconds as i64),
        KeyCode::Char('+') | KeyCode::Char('=') => set_volume(app, player, 0.05),
        KeyCode::Char('-') => set_volume(app, player, -0.05),
        KeyCode::Char('R') => restart_scan(app, scanner),
        KeyCode::Char('[') => {
            app.min_duration = app
                .min_duration
                .saturating_sub(settings.controls.min_duration_step);
            restart_scan(app, scanner);
        }
        KeyCode::Char(']') => {
            app.min_duration += settings.controls.min_duration_step;
            restart_scan(app, scanner);
        }
        KeyCode::Char('c') => {
            app.pane = Pane::Playlists;
            app.name_input = Some(String::new());
        }
        KeyCode::Char('X') => {
            if let Some(name) = app.selected_playlist().map(str::to_string) {
                playlists.delete(&name);
                app.refresh_playlists(playlists);
            }
        }
        KeyCode::Char('a') => {
            if let (Some(track), Some(name)) = (app.selected_track(), app.selected_playlist()) {
                playlists.add_track(name, &track.path.to_string_lossy());
            }
        }
        KeyCode::Char('x') => {
            if let (Some(track), Some(name)) = (app.selected_track(), app.selected_playlist()) {
                playlists.remove_track(name, &track.path.to_string_lossy());
            }
        }
        _ => {}
    }

    Ok(false)
}
