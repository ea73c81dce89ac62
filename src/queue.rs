use crate::model::{RepeatMode, Track};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

/// Ordered play sequence with shuffle, repeat and "previous" history.
///
/// The track list itself never reorders: shuffle is a separate permutation of
/// indices, so turning shuffle off can always find the real list position again.
#[derive(Debug)]
pub struct Queue {
    tracks: Vec<Track>,
    current_index: Option<usize>,
    shuffle_mode: bool,
    repeat_mode: RepeatMode,
    history: Vec<usize>,
    shuffle_order: Vec<usize>,
    rng: SmallRng,
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Queue {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::try_from_rng(&mut rand::rngs::SysRng).expect("unexpected failure from SysRng"))
    }

    pub fn with_rng(rng: SmallRng) -> Self {
        Self {
            tracks: Vec::new(),
            current_index: None,
            shuffle_mode: false,
            repeat_mode: RepeatMode::None,
            history: Vec::new(),
            shuffle_order: Vec::new(),
            rng,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn shuffle_mode(&self) -> bool {
        self.shuffle_mode
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
    }

    pub fn history(&self) -> &[usize] {
        &self.history
    }

    pub fn shuffle_order(&self) -> &[usize] {
        &self.shuffle_order
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_index.and_then(|idx| self.tracks.get(idx))
    }

    pub fn clear(&mut self) {
        log::debug!("clearing queue");
        self.tracks.clear();
        self.current_index = None;
        self.history.clear();
        self.shuffle_order.clear();
    }

    pub fn add(&mut self, track: Track) {
        self.add_tracks(vec![track]);
    }

    /// Appends tracks. With shuffle on, only the appended segment of the
    /// shuffle order is permuted; positions of earlier tracks are kept.
    pub fn add_tracks(&mut self, tracks: Vec<Track>) {
        if tracks.is_empty() {
            return;
        }

        log::debug!("adding {} tracks to queue", tracks.len());
        let original_len = self.tracks.len();
        self.tracks.extend(tracks);

        if self.shuffle_mode {
            self.shuffle_order.extend(original_len..self.tracks.len());
            self.shuffle_order[original_len..].shuffle(&mut self.rng);
        }

        if self.current_index.is_none() {
            self.current_index = Some(0);
            if self.shuffle_mode {
                self.move_to_shuffle_front(0);
            }
        }
    }

    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        log::debug!("replacing queue with {} tracks", tracks.len());
        self.clear();
        self.add_tracks(tracks);
    }

    pub fn play_track(&mut self, index: usize) -> bool {
        if index >= self.tracks.len() {
            log::debug!("cannot play index {index}, queue holds {}", self.tracks.len());
            return false;
        }

        if let Some(current) = self.current_index {
            self.history.push(current);
        }
        self.current_index = Some(index);
        true
    }

    /// Track `next_track` would move to, without moving.
    pub fn peek_next(&self) -> Option<&Track> {
        self.next_index().and_then(|idx| self.tracks.get(idx))
    }

    pub fn next_track(&mut self) -> Option<&Track> {
        if self.tracks.is_empty() {
            log::debug!("no next track: queue is empty");
            return None;
        }

        if self.repeat_mode == RepeatMode::One && self.current_index.is_some() {
            log::debug!("repeat one: replaying current track");
            return self.current_track();
        }

        let Some(next) = self.next_index() else {
            log::debug!("end of queue reached without repeat");
            return None;
        };

        if let Some(current) = self.current_index {
            self.history.push(current);
        }
        log::debug!("advancing to index {next}");
        self.current_index = Some(next);
        self.current_track()
    }

    /// Steps back along the path actually taken when history exists,
    /// otherwise by list position.
    pub fn previous_track(&mut self) -> Option<&Track> {
        let Some(previous) = self.previous_index() else {
            log::debug!("no previous track: queue is empty");
            return None;
        };

        if self.history.pop().is_some() {
            log::debug!("going back to index {previous} from history");
        } else {
            log::debug!("stepping back to index {previous}");
        }
        self.current_index = Some(previous);
        self.current_track()
    }

    /// Track `previous_track` would move to, without moving.
    pub fn peek_previous(&self) -> Option<&Track> {
        self.previous_index().and_then(|idx| self.tracks.get(idx))
    }

    pub fn toggle_shuffle_mode(&mut self) {
        self.shuffle_mode = !self.shuffle_mode;
        log::debug!("shuffle mode set to {}", self.shuffle_mode);

        if self.shuffle_mode {
            self.shuffle_order = (0..self.tracks.len()).collect();
            self.shuffle_order.shuffle(&mut self.rng);
            if let Some(current) = self.current_index {
                self.move_to_shuffle_front(current);
                self.current_index = self.shuffle_order.first().copied();
            }
        } else {
            if let Some(current_id) = self.current_track().map(|track| track.id.clone()) {
                self.current_index = self
                    .tracks
                    .iter()
                    .position(|track| track.id == current_id);
            }
            self.shuffle_order.clear();
        }

        self.history.clear();
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        self.repeat_mode = self.repeat_mode.next();
        log::debug!("repeat mode set to {:?}", self.repeat_mode);
        self.repeat_mode
    }

    /// Stores a corrected duration on every queued copy of the track.
    pub fn set_track_duration(&mut self, id: &str, duration: u32) {
        for track in self.tracks.iter_mut().filter(|track| track.id == id) {
            track.duration = duration;
        }
    }

    fn next_index(&self) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }

        let Some(current) = self.current_index else {
            return if self.shuffle_mode {
                self.shuffle_order.first().copied()
            } else {
                Some(0)
            };
        };

        if self.repeat_mode == RepeatMode::One {
            return Some(current);
        }

        if self.shuffle_mode {
            let position = self.shuffle_order.iter().position(|idx| *idx == current);
            match position {
                Some(pos) if pos + 1 < self.shuffle_order.len() => {
                    Some(self.shuffle_order[pos + 1])
                }
                _ if self.repeat_mode == RepeatMode::All => self.shuffle_order.first().copied(),
                _ => None,
            }
        } else if current + 1 < self.tracks.len() {
            Some(current + 1)
        } else if self.repeat_mode == RepeatMode::All {
            Some(0)
        } else {
            None
        }
    }

    fn previous_index(&self) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }

        if let Some(prev) = self.history.last() {
            return Some(*prev);
        }

        if self.shuffle_mode {
            // No predecessor is defined in shuffle order without history.
            return self
                .current_index
                .or_else(|| self.shuffle_order.first().copied());
        }

        match self.current_index {
            Some(0) | None if self.repeat_mode == RepeatMode::All => Some(self.tracks.len() - 1),
            Some(0) | None => Some(0),
            Some(current) => Some(current - 1),
        }
    }

    fn move_to_shuffle_front(&mut self, index: usize) {
        if let Some(pos) = self.shuffle_order.iter().position(|idx| *idx == index) {
            self.shuffle_order.swap(0, pos);
        }
    }
}
