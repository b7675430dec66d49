//! Tag extraction with ordered fallbacks.
//!
//! Titles come from the structured tag when present, then from any other
//! tag block in the file, then from the filename with its numeric id
//! stripped. Extraction never fails past this boundary: unreadable or
//! untagged files simply yield an empty record.

use std::path::Path;
use std::time::Duration;

use lofty::file::{AudioFile, TaggedFile, TaggedFileExt};
use lofty::tag::ItemKey;

use super::model::TrackMeta;
use super::title::strip_leading_numbers;

type TitleSource = fn(&TaggedFile, &Path) -> Option<String>;

/// Ordered title fallbacks; the first non-empty result wins.
const TITLE_SOURCES: &[TitleSource] = &[structured_title, any_tag_title, filename_title];

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn structured_title(file: &TaggedFile, _path: &Path) -> Option<String> {
    let tag = file.primary_tag().or_else(|| file.first_tag())?;
    non_empty(tag.get_string(&ItemKey::TrackTitle))
}

fn any_tag_title(file: &TaggedFile, _path: &Path) -> Option<String> {
    file.tags()
        .iter()
        .find_map(|tag| non_empty(tag.get_string(&ItemKey::TrackTitle)))
}

fn filename_title(_file: &TaggedFile, path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    non_empty(Some(strip_leading_numbers(stem)))
}

/// Read `key` from the primary tag, falling back to any other tag block.
fn tag_field(file: &TaggedFile, key: &ItemKey) -> Option<String> {
    file.primary_tag()
        .or_else(|| file.first_tag())
        .and_then(|tag| non_empty(tag.get_string(key)))
        .or_else(|| {
            file.tags()
                .iter()
                .find_map(|tag| non_empty(tag.get_string(key)))
        })
}

/// Extract metadata for `path`. The stamp fields are left unset; the
/// scanner fills them from the file it actually read.
pub fn extract(path: &Path) -> TrackMeta {
    let Ok(file) = lofty::read_from_path(path) else {
        return TrackMeta::default();
    };

    let duration = file.properties().duration();
    TrackMeta {
        title: TITLE_SOURCES.iter().find_map(|source| source(&file, path)),
        artist: tag_field(&file, &ItemKey::TrackArtist),
        album: tag_field(&file, &ItemKey::AlbumTitle),
        duration: (!duration.is_zero()).then(|| duration.as_secs()),
        mtime: None,
        size: None,
    }
}

/// One-time lazy duration probe for records that came back without one.
/// Callers cache the result; `None` means the stream could not be read.
pub fn ensure_duration(path: &Path) -> Option<Duration> {
    let file = lofty::read_from_path(path).ok()?;
    let duration = file.properties().duration();
    (!duration.is_zero()).then_some(duration)
}
