use serde::{Deserialize, Serialize};

/// A catalog track. `id` is opaque and unique within one queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Length in seconds. Catalog values are often wrong and get corrected by the probe.
    #[serde(default)]
    pub duration: u32,
}

impl Track {
    pub fn new(id: &str, title: &str, artist: &str, duration: u32) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            duration,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RepeatMode {
    #[default]
    None,
    One,
    All,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::One,
            Self::One => Self::All,
            Self::All => Self::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "Repeat: Off",
            Self::One => "Repeat: One",
            Self::All => "Repeat: All",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Everything the presentation layer reads to draw the player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub is_playing: bool,
    pub current_pos: u32,
    pub duration: u32,
    pub current_index: Option<usize>,
    pub current_track: Option<Track>,
    pub tracks: Vec<Track>,
    pub repeat_mode: RepeatMode,
    pub shuffle_mode: bool,
}

/// The counters a progress tick can change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerProgress {
    pub state: PlaybackState,
    pub is_playing: bool,
    pub current_pos: u32,
    pub duration: u32,
}

pub fn format_clock(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
