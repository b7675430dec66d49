//! Beatmap background lookup.
//!
//! Each song folder usually ships a `.osu` descriptor whose `[Events]`
//! section names the background image as the first quoted filename, e.g.
//! `0,0,"bg.jpg",0,0`. Parsing is deliberately forgiving: anything
//! unexpected resolves to "no image" rather than an error.

use std::fs;
use std::path::{Path, PathBuf};

const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// What the now-playing panel should show for the current track.
///
/// There is always a defined value: either a resolved image path or the
/// fixed placeholder, so the layout never shifts on track changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Artwork {
    Image(PathBuf),
    #[default]
    Placeholder,
}

pub fn artwork_for(folder: &Path) -> Artwork {
    locate_background_image(folder)
        .map(Artwork::Image)
        .unwrap_or(Artwork::Placeholder)
}

/// Find the background image referenced by the first `.osu` file in
/// `folder`, if it resolves to an existing file.
pub fn locate_background_image(folder: &Path) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(folder)
        .ok()?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();
    entries.sort();

    let descriptor = entries.into_iter().find(|p| {
        p.extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("osu"))
            .unwrap_or(false)
    })?;

    // Descriptors are not always valid UTF-8; decode lossily.
    let bytes = fs::read(&descriptor).ok()?;
    let text = String::from_utf8_lossy(&bytes);

    let mut in_events = false;
    for line in text.lines() {
        let line = line.trim();
        if line == "[Events]" {
            in_events = true;
            continue;
        }
        if !in_events {
            continue;
        }
        if line.starts_with('[') {
            break;
        }
        let Some(name) = first_quoted(line) else {
            continue;
        };
        if !has_image_ext(name) {
            continue;
        }
        let candidate = folder.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        // Some descriptors carry Windows-style subfolder paths.
        let normalized = folder.join(name.replace('\\', "/"));
        if normalized.is_file() {
            return Some(normalized);
        }
    }
    None
}

fn first_quoted(line: &str) -> Option<&str> {
    let start = line.find('"')? + 1;
    let len = line[start..].find('"')?;
    Some(&line[start..start + len])
}

fn has_image_ext(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    IMAGE_EXTS.iter().any(|ext| {
        lower.len() > ext.len() && lower.ends_with(ext) && lower.as_bytes()[lower.len() - ext.len() - 1] == b'.'
    })
}
