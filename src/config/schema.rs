use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/kiai/config.toml` or `~/.config/kiai/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `KIAI__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub audio: AudioSettings,
    pub controls: ControlsSettings,
    pub ui: UiSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Songs root. Defaults to the conventional osu! install location
    /// under the user's home; the first CLI argument overrides both.
    pub songs_dir: Option<PathBuf>,
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Tracks shorter than this many seconds are excluded from scans.
    /// Hit-sound and preview clips in beatmap folders fall under it.
    pub min_duration_seconds: u64,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            songs_dir: None,
            extensions: vec!["mp3".into(), "ogg".into(), "wav".into()],
            min_duration_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Initial output volume, `0.0..=1.0`.
    pub volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self { volume: 0.8 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to scrub when pressing `H` / `L`.
    pub scrub_seconds: u64,
    /// Step applied to the minimum-duration cutoff by `[` / `]`.
    pub min_duration_step: u64,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            scrub_seconds: 5,
            min_duration_step: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ one song per beatmap, forever ~ ".to_string(),
        }
    }
}

impl Settings {
    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.audio.volume) {
            return Err("audio.volume must be within 0.0..=1.0".to_string());
        }
        if self.library.extensions.is_empty() {
            return Err("library.extensions must not be empty".to_string());
        }
        Ok(())
    }
}

/// The conventional osu! songs folder under the user's home directory.
pub fn default_songs_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| {
            home.join("AppData")
                .join("Local")
                .join("osu!")
                .join("Songs")
        })
        .unwrap_or_else(|| PathBuf::from("Songs"))
}
