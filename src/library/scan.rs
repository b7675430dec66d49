//! Incremental library discovery.
//!
//! A scan walks the songs tree on its own thread and streams discovery
//! events back over a channel, so the first visible result never waits for
//! a multi-thousand-folder walk to finish. Exactly one track is considered
//! per folder: the first supported audio filename in lexicographic order,
//! matching the one-audio-asset-per-beatmap layout.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::UNIX_EPOCH;

use tracing::warn;
use walkdir::WalkDir;

use super::metadata;
use super::model::{Track, TrackMeta};
use super::title::{parse_artist_from_folder, strip_leading_numbers};

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Extensions treated as audio, case-insensitive, with or without dot.
    pub extensions: Vec<String>,
    /// Tracks with a known duration below this are excluded (and counted).
    pub min_duration_seconds: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".into(), "ogg".into(), "wav".into()],
            min_duration_seconds: 30,
        }
    }
}

#[derive(Debug)]
pub enum ScanEvent {
    /// A candidate track was found. Dedup against prior scans happens in
    /// the consumer-owned index.
    Discovered { track: Track },
    /// A track with a known duration below the cutoff was dropped.
    Excluded { path: PathBuf },
    /// The root could not be scanned at all.
    Failed { error: String },
    /// The pass is over; also the natural cache-save point.
    Finished { found: usize, excluded: usize },
}

/// Handle to a running scan. A fresh scan supersedes the old one: cancel
/// this handle and spawn again; passes never resume.
pub struct ScanHandle {
    cancelled: Arc<AtomicBool>,
}

impl ScanHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

/// Start a scan of `root` on a background thread.
///
/// `cached` is an immutable snapshot of the metadata store used for
/// freshness checks; a record whose mtime/size stamp still matches the
/// file skips extraction entirely.
pub fn spawn_scan(
    root: PathBuf,
    options: ScanOptions,
    cached: HashMap<String, TrackMeta>,
    tx: Sender<ScanEvent>,
) -> ScanHandle {
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    thread::spawn(move || run_scan(&root, &options, &cached, &tx, &flag));
    ScanHandle { cancelled }
}

fn run_scan(
    root: &Path,
    options: &ScanOptions,
    cached: &HashMap<String, TrackMeta>,
    tx: &Sender<ScanEvent>,
    cancelled: &AtomicBool,
) {
    if !root.is_dir() {
        let _ = tx.send(ScanEvent::Failed {
            error: format!("songs directory not found: {}", root.display()),
        });
        return;
    }

    let extensions: Vec<String> = options
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    let mut found = 0usize;
    let mut excluded = 0usize;

    for entry in WalkDir::new(root).sort_by_file_name() {
        if cancelled.load(Ordering::Relaxed) {
            return;
        }
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                // Unreadable subtree; keep walking the rest.
                warn!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        match scan_folder(entry.path(), &extensions, options.min_duration_seconds, cached) {
            Ok(FolderOutcome::NoAudio) => {}
            Ok(FolderOutcome::TooShort(path)) => {
                excluded += 1;
                if tx.send(ScanEvent::Excluded { path }).is_err() {
                    return;
                }
            }
            Ok(FolderOutcome::Found(track)) => {
                found += 1;
                if tx.send(ScanEvent::Discovered { track }).is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!("skipping folder {}: {e}", entry.path().display());
            }
        }
    }

    let _ = tx.send(ScanEvent::Finished { found, excluded });
}

enum FolderOutcome {
    NoAudio,
    TooShort(PathBuf),
    Found(Track),
}

fn scan_folder(
    dir: &Path,
    extensions: &[String],
    min_duration: u64,
    cached: &HashMap<String, TrackMeta>,
) -> io::Result<FolderOutcome> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();

    let Some(first) = names.into_iter().find(|n| is_supported(n, extensions)) else {
        return Ok(FolderOutcome::NoAudio);
    };
    let path = dir.join(&first);
    let key = path.to_string_lossy().into_owned();
    let (mtime, size) = file_stamp(&path);

    let mut meta = match cached.get(&key) {
        Some(hit) if hit.is_fresh(mtime, size) => hit.clone(),
        _ => {
            let mut fresh = metadata::extract(&path);
            fresh.mtime = mtime;
            fresh.size = size;
            fresh
        }
    };
    if meta.duration.is_none() {
        meta.duration = metadata::ensure_duration(&path).map(|d| d.as_secs());
    }

    let folder_title = dir
        .file_name()
        .and_then(|s| s.to_str())
        .map(strip_leading_numbers)
        .unwrap_or("")
        .to_string();
    if meta.artist.is_none() {
        meta.artist = parse_artist_from_folder(&folder_title);
    }

    if let Some(duration) = meta.duration {
        if duration < min_duration {
            return Ok(FolderOutcome::TooShort(path));
        }
    }

    Ok(FolderOutcome::Found(Track {
        path,
        folder_title,
        meta,
    }))
}

fn is_supported(name: &str, extensions: &[String]) -> bool {
    let lower = name.to_ascii_lowercase();
    extensions.iter().any(|ext| {
        lower.len() > ext.len() + 1
            && lower.ends_with(ext.as_str())
            && lower.as_bytes()[lower.len() - ext.len() - 1] == b'.'
    })
}

fn file_stamp(path: &Path) -> (Option<u64>, Option<u64>) {
    match fs::metadata(path) {
        Ok(md) => {
            let mtime = md
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs());
            (mtime, Some(md.len()))
        }
        Err(_) => (None, None),
    }
}
