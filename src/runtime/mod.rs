use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};

use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use crate::app::App;
use crate::audio::{Player, PlayerCmd, RodioBackend, SharedMode};
use crate::config;
use crate::library::{
    MetadataStore, ScanEvent, ScanHandle, ScanOptions, Track, TrackMeta, spawn_scan,
};
use crate::playlist::PlaylistStore;

mod event_loop;
mod logging;
mod settings;

/// Owns the scan channel and supersedes one pass with the next: the old
/// handle is cancelled before a fresh scan starts.
pub(crate) struct Scanner {
    tx: Sender<ScanEvent>,
    extensions: Vec<String>,
    handle: Option<ScanHandle>,
}

impl Scanner {
    fn new(tx: Sender<ScanEvent>, extensions: Vec<String>) -> Self {
        Self {
            tx,
            extensions,
            handle: None,
        }
    }

    pub(crate) fn start(
        &mut self,
        root: &Path,
        min_duration_seconds: u64,
        cached: HashMap<String, TrackMeta>,
    ) {
        if let Some(old) = self.handle.take() {
            old.cancel();
        }
        let options = ScanOptions {
            extensions: self.extensions.clone(),
            min_duration_seconds,
        };
        self.handle = Some(spawn_scan(root.to_path_buf(), options, cached, self.tx.clone()));
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings::load_settings();
    let _log_guard = logging::init();

    let songs_dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| settings.library.songs_dir.clone())
        .unwrap_or_else(config::default_songs_dir);
    info!("songs dir: {}", songs_dir.display());

    // Hydrate from the cache so the list fills before the scan reports in.
    let store = MetadataStore::new(MetadataStore::default_path());
    let cache = store.load();

    let mode: SharedMode = Arc::new(Mutex::new(cache.settings.play_mode));
    let mut app = App::new(
        songs_dir.clone(),
        settings.library.min_duration_seconds,
        mode.clone(),
    );
    app.dark_mode = cache.settings.dark_mode;
    app.volume = settings.audio.volume;
    for record in &cache.items {
        let path = PathBuf::from(&record.path);
        if !path.exists() {
            // A fresh scan no longer finding the file drops it for good.
            continue;
        }
        app.index.upsert(Track {
            path,
            folder_title: record.folder_title.clone(),
            meta: record.meta.clone(),
        });
    }

    let mut backend = RodioBackend::new();
    if !crate::audio::AudioBackend::init(&mut backend) {
        app.status = Some("audio output unavailable".to_string());
    }
    let (player, player_events) = Player::new(Box::new(backend), mode);
    let _ = player.send(PlayerCmd::SetVolume(settings.audio.volume));
    app.set_playback_handle(player.info_handle());

    let mut playlists = PlaylistStore::new(PlaylistStore::default_path());
    app.refresh_playlists(&playlists);

    // Kick off the initial scan; results stream in incrementally.
    let (scan_tx, scan_rx) = mpsc::channel();
    let mut scanner = Scanner::new(scan_tx, settings.library.extensions.clone());
    app.scanning = true;
    scanner.start(&songs_dir, app.min_duration, cache.meta_by_path());

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = event_loop::run(
        &mut terminal,
        &settings,
        &mut app,
        &player,
        &player_events,
        &mut playlists,
        &store,
        &mut scanner,
        &scan_rx,
    );

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Last natural save point; also retries any earlier failed write.
    store.save(&app.cache_snapshot());
    app.cancel_run();
    player.shutdown();

    run_result
}
