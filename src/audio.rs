//! Audio subsystem: backend adapter, manual playback clock, the playback
//! controller thread and the playlist sequencer.

mod backend;
mod clock;
mod player;
mod sequencer;
mod types;

pub use backend::{AudioBackend, RodioBackend};
pub use clock::PlaybackClock;
pub use player::Player;
pub use sequencer::{RunHandle, make_order, spawn_run};
pub use types::{PlayMode, PlaybackHandle, PlaybackInfo, PlayerCmd, PlayerEvent, SharedMode};

#[cfg(test)]
mod tests;
