use crate::catalog::{Catalog, LibraryCatalog, WatchUrlResolver};
use crate::config::{self, PlayerConfig};
use crate::media::MpvLauncher;
use crate::model::{PlaybackState, PlayerStatus, Playlist, RepeatMode, Track, format_clock};
use crate::player::{PlayerCommand, PlayerParts};
use crate::probe::CommandProbe;
use crate::queue::Queue;
use crate::service::{PlayerService, PlayerUpdate, ServiceTiming};
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

const INPUT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Default, Clone)]
pub struct AppOptions {
    pub library: Option<PathBuf>,
    pub repeat: Option<RepeatMode>,
    pub shuffle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Quit,
}

/// Front-end state between commands: the last listing the user saw and the
/// last status the player published.
pub struct Session {
    catalog: Box<dyn Catalog>,
    listed: Vec<Track>,
    playlists: Vec<Playlist>,
    status: PlayerStatus,
    output: Vec<String>,
}

impl Session {
    pub fn new(catalog: Box<dyn Catalog>) -> Self {
        Self {
            catalog,
            listed: Vec::new(),
            playlists: Vec::new(),
            status: PlayerStatus::default(),
            output: Vec::new(),
        }
    }

    pub fn listed(&self) -> &[Track] {
        &self.listed
    }

    pub fn status(&self) -> &PlayerStatus {
        &self.status
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    fn say(&mut self, line: impl Into<String>) {
        self.output.push(line.into());
    }

    pub fn apply_update(&mut self, update: PlayerUpdate) {
        match update {
            PlayerUpdate::TrackStarted(track) => {
                self.say(format!("Now playing: {}", describe_track(&track)));
            }
            PlayerUpdate::Error(message) => self.say(format!("Error: {message}")),
            PlayerUpdate::Status(status) => {
                if status.repeat_mode != self.status.repeat_mode {
                    self.say(status.repeat_mode.label());
                }
                if status.shuffle_mode != self.status.shuffle_mode {
                    self.say(if status.shuffle_mode {
                        "Shuffle: On"
                    } else {
                        "Shuffle: Off"
                    });
                }
                self.announce_state(status.state);
                self.status = status;
            }
            PlayerUpdate::Progress(progress) => {
                self.announce_state(progress.state);
                self.status.state = progress.state;
                self.status.is_playing = progress.is_playing;
                self.status.current_pos = progress.current_pos;
                self.status.duration = progress.duration;
            }
            PlayerUpdate::Stopped => {}
        }
    }

    fn announce_state(&mut self, state: PlaybackState) {
        match (self.status.state, state) {
            (old, new) if old == new => {}
            (_, PlaybackState::Paused) => self.say("Paused"),
            (PlaybackState::Paused, PlaybackState::Playing) => self.say("Resumed"),
            (_, PlaybackState::Idle) => self.say("Stopped"),
            _ => {}
        }
    }

    fn show_tracks(&mut self, tracks: Vec<Track>, empty_message: String) {
        if tracks.is_empty() {
            self.say(empty_message);
            return;
        }

        for (idx, track) in tracks.iter().enumerate() {
            self.say(format!("{:>3}. {}", idx + 1, describe_track(track)));
        }
        self.listed = tracks;
    }
}

pub fn run(options: AppOptions) -> Result<()> {
    let config = config::load_config()?;
    let catalog = load_catalog(&options, &config)?;

    let mut queue = Queue::new();
    if let Some(mode) = options.repeat {
        queue.set_repeat_mode(mode);
    }
    if options.shuffle {
        queue.toggle_shuffle_mode();
    }

    let parts = PlayerParts {
        launcher: Box::new(MpvLauncher::from_config(&config)),
        probe: Box::new(CommandProbe::from_config(&config)),
        resolver: Box::new(WatchUrlResolver::new(&config.stream_url_base)),
    };
    let mut service = PlayerService::start(parts, queue, ServiceTiming::from_config(&config));
    let mut session = Session::new(catalog);

    let (line_tx, line_rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if line_tx.send(line).is_err() {
                return;
            }
        }
    });

    println!("ytmusic ready. Type `help` for commands.");
    let result: Result<()> = loop {
        while let Some(update) = service.try_recv_update() {
            session.apply_update(update);
        }
        flush_output(&mut session)?;

        let line = match line_rx.recv_timeout(INPUT_POLL) {
            Ok(line) => line.context("failed to read command")?,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break Ok(()),
        };

        let outcome = run_command(&mut session, &mut |command| service.send(command), &line);
        flush_output(&mut session)?;
        if outcome == CommandOutcome::Quit {
            break Ok(());
        }
    };

    service.shutdown();
    result
}

fn load_catalog(options: &AppOptions, config: &PlayerConfig) -> Result<Box<dyn Catalog>> {
    let path = options.library.clone().or_else(|| config.library_file.clone());
    match path {
        Some(path) => Ok(Box::new(LibraryCatalog::load(&path)?)),
        None => {
            log::info!("no library file configured, catalog is empty");
            Ok(Box::new(LibraryCatalog::default()))
        }
    }
}

fn flush_output(session: &mut Session) -> Result<()> {
    let mut out = io::stdout().lock();
    for line in session.take_output() {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

pub fn run_command(
    session: &mut Session,
    send: &mut dyn FnMut(PlayerCommand),
    raw: &str,
) -> CommandOutcome {
    let input = raw.trim();
    if input.is_empty() {
        return CommandOutcome::Continue;
    }

    let mut command_split = input.splitn(2, char::is_whitespace);
    let command = command_split.next().unwrap_or_default();
    let rest = command_split.next().unwrap_or("").trim();

    match command {
        "help" => session.say(
            "Commands: search <query> | playlists | playlist <n|id> | liked | play [n] | url <url> [seconds] | next | prev | pause | stop | shuffle | repeat | queue | status | quit",
        ),
        "search" => {
            if rest.is_empty() {
                session.say("Usage: search <query>");
            } else {
                match session.catalog.search(rest) {
                    Ok(tracks) => {
                        session.show_tracks(tracks, format!("No results found for: {rest}"))
                    }
                    Err(err) => session.say(format!("Search failed: {err:#}")),
                }
            }
        }
        "playlists" => match session.catalog.user_playlists() {
            Ok(playlists) if playlists.is_empty() => session.say("No playlists found"),
            Ok(playlists) => {
                for (idx, playlist) in playlists.iter().enumerate() {
                    session.say(format!(
                        "{:>3}. {} ({} tracks)",
                        idx + 1,
                        playlist.title,
                        playlist.tracks.len()
                    ));
                }
                session.playlists = playlists;
            }
            Err(err) => session.say(format!("Failed to load playlists: {err:#}")),
        },
        "playlist" => {
            if rest.is_empty() {
                session.say("Usage: playlist <n|id>");
                return CommandOutcome::Continue;
            }
            let playlist_id = match rest.parse::<usize>() {
                Ok(n) if n >= 1 && n <= session.playlists.len() => {
                    session.playlists[n - 1].id.clone()
                }
                _ => rest.to_string(),
            };
            match session.catalog.playlist_tracks(&playlist_id) {
                Ok(tracks) => session.show_tracks(tracks, String::from("Playlist is empty")),
                Err(err) => session.say(format!("Failed to load playlist: {err:#}")),
            }
        }
        "liked" => match session.catalog.liked_tracks() {
            Ok(tracks) => session.show_tracks(tracks, String::from("No liked songs found")),
            Err(err) => session.say(format!("Failed to load liked songs: {err:#}")),
        },
        "play" => {
            if rest.is_empty() {
                send(PlayerCommand::PlayCurrent);
                return CommandOutcome::Continue;
            }
            match rest.parse::<usize>() {
                Ok(n) if n >= 1 && n <= session.listed.len() => send(PlayerCommand::PlaySelection {
                    tracks: session.listed.clone(),
                    index: n - 1,
                }),
                _ if session.listed.is_empty() => {
                    session.say("Nothing listed yet. Try search, playlist or liked first")
                }
                _ => session.say(format!("Pick a number between 1 and {}", session.listed.len())),
            }
        }
        "url" => {
            let mut url_split = rest.split_whitespace();
            let Some(url) = url_split.next() else {
                session.say("Usage: url <url> [seconds]");
                return CommandOutcome::Continue;
            };
            let duration_hint = match url_split.next().map(str::parse::<u32>) {
                None => 0,
                Some(Ok(seconds)) => seconds,
                Some(Err(_)) => {
                    session.say("Duration must be a whole number of seconds");
                    return CommandOutcome::Continue;
                }
            };
            send(PlayerCommand::PlayUrl {
                url: url.to_string(),
                duration_hint,
            });
        }
        "next" | "n" => send(PlayerCommand::Next),
        "prev" | "b" => send(PlayerCommand::Previous),
        "pause" | "p" => send(PlayerCommand::TogglePause),
        "stop" => send(PlayerCommand::Stop),
        "shuffle" | "s" => send(PlayerCommand::ToggleShuffle),
        "repeat" | "r" => send(PlayerCommand::CycleRepeat),
        "queue" => {
            if session.status.tracks.is_empty() {
                session.say("Queue is empty");
                return CommandOutcome::Continue;
            }
            let lines: Vec<String> = session
                .status
                .tracks
                .iter()
                .enumerate()
                .map(|(idx, track)| {
                    let marker = if session.status.current_index == Some(idx) {
                        '>'
                    } else {
                        ' '
                    };
                    format!("{marker}{:>3}. {}", idx + 1, describe_track(track))
                })
                .collect();
            for line in lines {
                session.say(line);
            }
        }
        "status" => {
            let line = describe_status(&session.status);
            session.say(line);
        }
        "quit" | "q" | "exit" => return CommandOutcome::Quit,
        other => session.say(format!("Unknown command: {other} (try help)")),
    }

    CommandOutcome::Continue
}

fn describe_track(track: &Track) -> String {
    if track.duration > 0 {
        format!(
            "{} - {} ({})",
            track.title,
            track.artist,
            format_clock(track.duration)
        )
    } else {
        format!("{} - {}", track.title, track.artist)
    }
}

pub fn describe_status(status: &PlayerStatus) -> String {
    let state = match status.state {
        PlaybackState::Idle => "Idle",
        PlaybackState::Playing => "Playing",
        PlaybackState::Paused => "Paused",
    };
    let track = status
        .current_track
        .as_ref()
        .map(|track| format!("{} - {}", track.title, track.artist))
        .unwrap_or_else(|| String::from("nothing selected"));
    let shuffle = if status.shuffle_mode { "On" } else { "Off" };
    format!(
        "[{state}] {track} {} / {} | {} | Shuffle: {shuffle}",
        format_clock(status.current_pos),
        format_clock(status.duration),
        status.repeat_mode.label()
    )
}
