use crate::catalog::StreamResolver;
use crate::media::{MediaLauncher, MediaProcess};
use crate::model::{PlaybackState, PlayerProgress, PlayerStatus, RepeatMode, Track};
use crate::probe::DurationProbe;
use crate::queue::Queue;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("no track is selected")]
    NoCurrentTrack,
    #[error("no next track in queue")]
    NoNextTrack,
    #[error("no previous track in queue")]
    NoPreviousTrack,
    #[error("queue has no track at index {0}")]
    InvalidIndex(usize),
    #[error("could not resolve stream for track {track_id}: {reason}")]
    StreamUnavailable { track_id: String, reason: String },
    #[error("failed to start media player: {0}")]
    Spawn(#[source] io::Error),
    #[error("failed to stop media player: {0}")]
    Kill(#[source] io::Error),
    #[error("failed to pause or resume media player: {0}")]
    Pause(#[source] io::Error),
    #[error("pausing is not supported on this platform")]
    PauseUnsupported,
    #[error("media process handle is poisoned")]
    ProcessLock,
}

#[derive(Debug, Clone)]
pub enum PlayerCommand {
    SetTracks(Vec<Track>),
    AddTracks(Vec<Track>),
    ClearQueue,
    /// Queue `tracks` starting at `index` and play it. Under RepeatAll the
    /// tracks before `index` are appended so the whole list keeps cycling.
    PlaySelection { tracks: Vec<Track>, index: usize },
    PlayIndex(usize),
    PlayCurrent,
    PlayUrl { url: String, duration_hint: u32 },
    Next,
    Previous,
    TogglePause,
    Stop,
    ToggleShuffle,
    CycleRepeat,
    SetRepeat(RepeatMode),
    Shutdown,
}

/// Everything the owner thread reacts to arrives through one channel.
#[derive(Debug)]
pub enum PlayerMessage {
    Command(PlayerCommand),
    /// Carries the moment the tick was sent.
    Tick(Instant),
    ProcessExited { generation: u64 },
}

pub struct PlayerParts {
    pub launcher: Box<dyn MediaLauncher>,
    pub probe: Box<dyn DurationProbe>,
    pub resolver: Box<dyn StreamResolver>,
}

type SharedProcess = Arc<Mutex<Box<dyn MediaProcess>>>;

struct ActivePlayback {
    generation: u64,
    process: SharedProcess,
    cancel: Arc<AtomicBool>,
    watcher: Option<JoinHandle<()>>,
}

/// Supervises one external renderer and advances the queue when a track ends.
///
/// All state is owned by whoever holds the `Player`; the watcher thread only
/// polls the process handle and reports exits back through `events`.
pub struct Player {
    parts: PlayerParts,
    queue: Queue,
    is_playing: bool,
    current_pos: u32,
    duration: u32,
    track_elapsed: bool,
    started_at: Option<Instant>,
    generation: u64,
    active: Option<ActivePlayback>,
    events: Sender<PlayerMessage>,
    watch_interval: Duration,
}

impl Player {
    pub fn new(
        parts: PlayerParts,
        queue: Queue,
        events: Sender<PlayerMessage>,
        watch_interval: Duration,
    ) -> Self {
        Self {
            parts,
            queue,
            is_playing: false,
            current_pos: 0,
            duration: 0,
            track_elapsed: false,
            started_at: None,
            generation: 0,
            active: None,
            events,
            watch_interval,
        }
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut Queue {
        &mut self.queue
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_pos(&self) -> u32 {
        self.current_pos
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn state(&self) -> PlaybackState {
        match (&self.active, self.is_playing) {
            (None, _) => PlaybackState::Idle,
            (Some(_), true) => PlaybackState::Playing,
            (Some(_), false) => PlaybackState::Paused,
        }
    }

    pub fn progress(&self) -> PlayerProgress {
        PlayerProgress {
            state: self.state(),
            is_playing: self.is_playing,
            current_pos: self.current_pos,
            duration: self.duration,
        }
    }

    pub fn status(&self) -> PlayerStatus {
        PlayerStatus {
            state: self.state(),
            is_playing: self.is_playing,
            current_pos: self.current_pos,
            duration: self.duration,
            current_index: self.queue.current_index(),
            current_track: self.queue.current_track().cloned(),
            tracks: self.queue.tracks().to_vec(),
            repeat_mode: self.queue.repeat_mode(),
            shuffle_mode: self.queue.shuffle_mode(),
        }
    }

    /// Starts `url`, replacing whatever was playing. Returns the duration in
    /// effect: the probed length when the probe answers, else `duration_hint`.
    pub fn play(&mut self, url: &str, duration_hint: u32) -> Result<u32, PlayerError> {
        self.stop()?;

        let duration = match self.parts.probe.probe_duration(url) {
            Some(probed) => {
                if probed != duration_hint {
                    log::debug!("probe corrected duration {duration_hint}s -> {probed}s");
                }
                probed
            }
            None => duration_hint,
        };

        let process = self.parts.launcher.launch(url).map_err(PlayerError::Spawn)?;
        self.generation += 1;
        let generation = self.generation;
        log::debug!("process {} started as generation {generation}", process.id());

        let process: SharedProcess = Arc::new(Mutex::new(process));
        let cancel = Arc::new(AtomicBool::new(false));
        let watcher = spawn_watcher(
            generation,
            Arc::clone(&process),
            Arc::clone(&cancel),
            self.events.clone(),
            self.watch_interval,
        );

        self.active = Some(ActivePlayback {
            generation,
            process,
            cancel,
            watcher: Some(watcher),
        });
        self.current_pos = 0;
        self.duration = duration;
        self.track_elapsed = false;
        self.started_at = Some(Instant::now());
        self.is_playing = true;
        Ok(duration)
    }

    /// Kills and reaps the live process. Position is kept; a no-op when idle.
    pub fn stop(&mut self) -> Result<(), PlayerError> {
        let Some(active) = self.active.as_ref() else {
            self.is_playing = false;
            return Ok(());
        };

        {
            let mut process = active.process.lock().map_err(|_| PlayerError::ProcessLock)?;
            process.terminate().map_err(PlayerError::Kill)?;
        }

        if let Some(active) = self.active.take() {
            release(active);
        }
        self.is_playing = false;
        log::debug!("playback stopped at {}s of {}s", self.current_pos, self.duration);
        Ok(())
    }

    /// Flips the playing flag, suspending or continuing the live process.
    /// Without a process only the flag changes.
    pub fn toggle_pause(&mut self) -> Result<(), PlayerError> {
        if let Some(active) = &self.active {
            let mut process = active.process.lock().map_err(|_| PlayerError::ProcessLock)?;
            let result = if self.is_playing {
                process.pause()
            } else {
                process.resume()
            };
            match result {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::Unsupported => {
                    return Err(PlayerError::PauseUnsupported);
                }
                Err(err) => return Err(PlayerError::Pause(err)),
            }
        }

        self.is_playing = !self.is_playing;
        log::debug!("playing flag is now {}", self.is_playing);
        Ok(())
    }

    pub fn play_next(&mut self) -> Result<Track, PlayerError> {
        let track = self.queue.peek_next().cloned().ok_or(PlayerError::NoNextTrack)?;
        let url = self.resolve(&track)?;
        self.queue.next_track();
        self.start_track(track, &url)
    }

    pub fn play_previous(&mut self) -> Result<Track, PlayerError> {
        let track = self
            .queue
            .peek_previous()
            .cloned()
            .ok_or(PlayerError::NoPreviousTrack)?;
        let url = self.resolve(&track)?;
        self.queue.previous_track();
        self.start_track(track, &url)
    }

    pub fn play_index(&mut self, index: usize) -> Result<Track, PlayerError> {
        let track = self
            .queue
            .tracks()
            .get(index)
            .cloned()
            .ok_or(PlayerError::InvalidIndex(index))?;
        let url = self.resolve(&track)?;
        self.queue.play_track(index);
        self.start_track(track, &url)
    }

    pub fn play_current(&mut self) -> Result<Track, PlayerError> {
        let track = self
            .queue
            .current_track()
            .cloned()
            .ok_or(PlayerError::NoCurrentTrack)?;
        let url = self.resolve(&track)?;
        self.start_track(track, &url)
    }

    pub fn play_selection(&mut self, tracks: Vec<Track>, index: usize) -> Result<Track, PlayerError> {
        if index >= tracks.len() {
            return Err(PlayerError::InvalidIndex(index));
        }

        let mut ordered = tracks;
        let mut head = ordered.split_off(index);
        if self.queue.repeat_mode() == RepeatMode::All {
            head.extend(ordered);
        }
        self.queue.set_tracks(head);
        self.play_current()
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.queue.toggle_shuffle_mode();
        self.queue.shuffle_mode()
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        self.queue.cycle_repeat_mode()
    }

    /// One progress tick. At the end of a known duration the position wraps
    /// and the track is remembered as elapsed for the exit check.
    ///
    /// Ticks sent before the current track started are dropped: they queue up
    /// behind a slow duration probe and must not count as playback time.
    pub fn on_tick(&mut self, sent_at: Instant) {
        if !self.is_playing {
            return;
        }
        if self.started_at.is_some_and(|started| sent_at < started) {
            return;
        }

        self.current_pos += 1;
        if self.duration > 0 && self.current_pos >= self.duration {
            self.current_pos = 0;
            self.track_elapsed = true;
            if self.queue.peek_next().is_none() {
                log::debug!("reached end of last track");
                self.is_playing = false;
            }
        }
    }

    /// Reacts to a watcher report. Returns the track started when the exit
    /// was a natural completion and the queue had somewhere to go.
    pub fn on_process_exit(&mut self, generation: u64) -> Result<Option<Track>, PlayerError> {
        let is_current = self
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation);
        if !is_current {
            log::debug!("ignoring exit of stale generation {generation}");
            return Ok(None);
        }

        let finished = self.finished_naturally();
        if let Some(active) = self.active.take() {
            release(active);
        }
        log::debug!(
            "generation {generation} exited at {}s of {}s, natural: {finished}",
            self.current_pos,
            self.duration
        );

        if !finished {
            self.is_playing = false;
            return Ok(None);
        }

        match self.play_next() {
            Ok(track) => Ok(Some(track)),
            Err(PlayerError::NoNextTrack) => {
                log::info!("queue finished");
                self.is_playing = false;
                Ok(None)
            }
            Err(err) => {
                self.is_playing = false;
                Err(err)
            }
        }
    }

    pub fn handle(&mut self, message: PlayerMessage) -> Result<Option<Track>, PlayerError> {
        match message {
            PlayerMessage::Tick(sent_at) => {
                self.on_tick(sent_at);
                Ok(None)
            }
            PlayerMessage::ProcessExited { generation } => self.on_process_exit(generation),
            PlayerMessage::Command(command) => self.apply(command),
        }
    }

    fn apply(&mut self, command: PlayerCommand) -> Result<Option<Track>, PlayerError> {
        match command {
            PlayerCommand::SetTracks(tracks) => {
                self.queue.set_tracks(tracks);
                Ok(None)
            }
            PlayerCommand::AddTracks(tracks) => {
                self.queue.add_tracks(tracks);
                Ok(None)
            }
            PlayerCommand::ClearQueue => {
                self.queue.clear();
                Ok(None)
            }
            PlayerCommand::PlaySelection { tracks, index } => {
                self.play_selection(tracks, index).map(Some)
            }
            PlayerCommand::PlayIndex(index) => self.play_index(index).map(Some),
            PlayerCommand::PlayCurrent => self.play_current().map(Some),
            PlayerCommand::PlayUrl { url, duration_hint } => {
                self.play(&url, duration_hint).map(|_| None)
            }
            PlayerCommand::Next => self.play_next().map(Some),
            PlayerCommand::Previous => self.play_previous().map(Some),
            PlayerCommand::TogglePause => self.toggle_pause().map(|()| None),
            PlayerCommand::Stop | PlayerCommand::Shutdown => self.stop().map(|()| None),
            PlayerCommand::ToggleShuffle => {
                self.toggle_shuffle();
                Ok(None)
            }
            PlayerCommand::CycleRepeat => {
                self.cycle_repeat_mode();
                Ok(None)
            }
            PlayerCommand::SetRepeat(mode) => {
                self.queue.set_repeat_mode(mode);
                Ok(None)
            }
        }
    }

    fn finished_naturally(&self) -> bool {
        self.is_playing
            && (self.track_elapsed || self.current_pos >= self.duration.saturating_sub(1))
    }

    fn resolve(&self, track: &Track) -> Result<String, PlayerError> {
        self.parts
            .resolver
            .stream_url(track)
            .map_err(|err| PlayerError::StreamUnavailable {
                track_id: track.id.clone(),
                reason: format!("{err:#}"),
            })
    }

    fn start_track(&mut self, mut track: Track, url: &str) -> Result<Track, PlayerError> {
        let duration = self.play(url, track.duration)?;
        if duration != track.duration {
            self.queue.set_track_duration(&track.id, duration);
            track.duration = duration;
        }
        log::info!("playing {} - {}", track.artist, track.title);
        Ok(track)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::warn!("failed to stop media player on shutdown: {err}");
        }
    }
}

fn spawn_watcher(
    generation: u64,
    process: SharedProcess,
    cancel: Arc<AtomicBool>,
    events: Sender<PlayerMessage>,
    interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            if cancel.load(Ordering::Acquire) {
                return;
            }

            let exited = match process.lock() {
                Ok(mut process) => process.has_exited(),
                Err(_) => return,
            };
            match exited {
                Ok(false) => thread::sleep(interval),
                Ok(true) => break,
                Err(err) => {
                    log::warn!("lost track of media process: {err}");
                    break;
                }
            }
        }

        if !cancel.load(Ordering::Acquire) {
            let _ = events.send(PlayerMessage::ProcessExited { generation });
        }
    })
}

/// Cancels the watcher, waits for it, and reaps the process.
fn release(mut active: ActivePlayback) {
    active.cancel.store(true, Ordering::Release);
    if let Some(watcher) = active.watcher.take()
        && watcher.join().is_err()
    {
        log::warn!("watcher for generation {} panicked", active.generation);
    }

    if let Ok(mut process) = active.process.lock()
        && let Err(err) = process.terminate()
    {
        log::warn!("failed to reap media process: {err}");
    }
}
