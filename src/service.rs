use crate::config::PlayerConfig;
use crate::model::{PlayerProgress, PlayerStatus, Track};
use crate::player::{Player, PlayerCommand, PlayerMessage, PlayerParts};
use crate::queue::Queue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct ServiceTiming {
    pub tick_interval: Duration,
    pub watch_interval: Duration,
}

impl ServiceTiming {
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            tick_interval: Duration::from_millis(config.tick_interval_ms.max(1)),
            watch_interval: Duration::from_millis(config.watch_interval_ms.max(1)),
        }
    }
}

impl Default for ServiceTiming {
    fn default() -> Self {
        Self::from_config(&PlayerConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerUpdate {
    Status(PlayerStatus),
    /// Published after a tick; queue and modes are unchanged by ticks.
    Progress(PlayerProgress),
    TrackStarted(Track),
    Error(String),
    Stopped,
}

/// Runs a `Player` on its own thread. Commands, progress ticks and process
/// exits are all funnelled into that thread, which is the only one touching
/// player or queue state.
pub struct PlayerService {
    cmd_tx: Sender<PlayerMessage>,
    update_rx: Receiver<PlayerUpdate>,
    ticker_stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
}

impl PlayerService {
    pub fn start(parts: PlayerParts, queue: Queue, timing: ServiceTiming) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (update_tx, update_rx) = mpsc::channel();
        let ticker_stop = Arc::new(AtomicBool::new(false));

        let player = Player::new(parts, queue, cmd_tx.clone(), timing.watch_interval);
        let worker = thread::spawn(move || owner_loop(player, cmd_rx, update_tx));

        let ticker = {
            let tick_tx = cmd_tx.clone();
            let stop = Arc::clone(&ticker_stop);
            thread::spawn(move || ticker_loop(tick_tx, stop, timing.tick_interval))
        };

        Self {
            cmd_tx,
            update_rx,
            ticker_stop,
            worker: Some(worker),
            ticker: Some(ticker),
        }
    }

    pub fn send(&self, command: PlayerCommand) {
        let _ = self.cmd_tx.send(PlayerMessage::Command(command));
    }

    pub fn try_recv_update(&self) -> Option<PlayerUpdate> {
        match self.update_rx.try_recv() {
            Ok(update) => Some(update),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_update_timeout(&self, timeout: Duration) -> Option<PlayerUpdate> {
        match self.update_rx.recv_timeout(timeout) {
            Ok(update) => Some(update),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Stops playback and joins both background threads.
    pub fn shutdown(&mut self) {
        self.ticker_stop.store(true, Ordering::Release);
        let _ = self
            .cmd_tx
            .send(PlayerMessage::Command(PlayerCommand::Shutdown));

        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::error!("player thread panicked");
        }
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.join();
        }
    }
}

impl Drop for PlayerService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn ticker_loop(tick_tx: Sender<PlayerMessage>, stop: Arc<AtomicBool>, interval: Duration) {
    while !stop.load(Ordering::Acquire) {
        thread::sleep(interval);
        if tick_tx.send(PlayerMessage::Tick(Instant::now())).is_err() {
            return;
        }
    }
}

fn owner_loop(mut player: Player, cmd_rx: Receiver<PlayerMessage>, update_tx: Sender<PlayerUpdate>) {
    while let Ok(message) = cmd_rx.recv() {
        let shutdown = matches!(message, PlayerMessage::Command(PlayerCommand::Shutdown));
        let is_tick = matches!(message, PlayerMessage::Tick(_));
        if is_tick && !player.is_playing() {
            continue;
        }

        match player.handle(message) {
            Ok(Some(track)) => {
                let _ = update_tx.send(PlayerUpdate::TrackStarted(track));
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!("player error: {err}");
                let _ = update_tx.send(PlayerUpdate::Error(err.to_string()));
            }
        }

        if shutdown {
            break;
        }
        let update = if is_tick {
            PlayerUpdate::Progress(player.progress())
        } else {
            PlayerUpdate::Status(player.status())
        };
        let _ = update_tx.send(update);
    }

    drop(player);
    let _ = update_tx.send(PlayerUpdate::Stopped);
    log::debug!("player thread finished");
}
