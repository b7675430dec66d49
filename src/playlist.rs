//! Named playlists: a small JSON-backed store of ordered track paths.

mod store;

pub use store::{PLAYLISTS_FILENAME, Playlist, PlaylistStore};
