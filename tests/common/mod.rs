#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use ytmusic::catalog::StreamResolver;
use ytmusic::media::{MediaLauncher, MediaProcess};
use ytmusic::model::Track;
use ytmusic::player::PlayerParts;
use ytmusic::probe::DurationProbe;
use ytmusic::service::{PlayerService, PlayerUpdate};

/// Shared record of everything the fake launcher started.
#[derive(Clone, Default)]
pub struct LaunchLog {
    urls: Arc<Mutex<Vec<String>>>,
    exits: Arc<Mutex<Vec<Arc<AtomicBool>>>>,
}

impl LaunchLog {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().expect("urls").clone()
    }

    pub fn count(&self) -> usize {
        self.urls.lock().expect("urls").len()
    }

    pub fn finish_latest(&self) {
        if let Some(exit) = self.exits.lock().expect("exits").last() {
            exit.store(true, Ordering::SeqCst);
        }
    }

    pub fn all_reaped(&self) -> bool {
        self.exits
            .lock()
            .expect("exits")
            .iter()
            .all(|exit| exit.load(Ordering::SeqCst))
    }
}

struct FakeProcess {
    exited: Arc<AtomicBool>,
    started: Instant,
    run_for: Option<Duration>,
}

impl MediaProcess for FakeProcess {
    fn id(&self) -> u32 {
        4242
    }

    fn has_exited(&mut self) -> io::Result<bool> {
        if let Some(run_for) = self.run_for
            && self.started.elapsed() >= run_for
        {
            self.exited.store(true, Ordering::SeqCst);
        }
        Ok(self.exited.load(Ordering::SeqCst))
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.exited.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn resume(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct FakeLauncher {
    pub log: LaunchLog,
    /// Processes exit on their own after this long.
    pub run_for: Option<Duration>,
    pub fail: bool,
}

impl MediaLauncher for FakeLauncher {
    fn launch(&self, url: &str) -> io::Result<Box<dyn MediaProcess>> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::NotFound, "mpv not installed"));
        }
        let exited = Arc::new(AtomicBool::new(false));
        self.log.urls.lock().expect("urls").push(url.to_string());
        self.log.exits.lock().expect("exits").push(Arc::clone(&exited));
        Ok(Box::new(FakeProcess {
            exited,
            started: Instant::now(),
            run_for: self.run_for,
        }))
    }
}

pub struct FixedProbe(pub Option<u32>);

impl DurationProbe for FixedProbe {
    fn probe_duration(&self, _url: &str) -> Option<u32> {
        self.0
    }
}

/// Answers like a real `yt-dlp` call: only after a noticeable delay.
pub struct SlowProbe {
    pub delay: Duration,
    pub answer: Option<u32>,
}

impl DurationProbe for SlowProbe {
    fn probe_duration(&self, _url: &str) -> Option<u32> {
        std::thread::sleep(self.delay);
        self.answer
    }
}

pub struct TestResolver;

impl StreamResolver for TestResolver {
    fn stream_url(&self, track: &Track) -> anyhow::Result<String> {
        Ok(format!("test://{}", track.id))
    }
}

pub fn parts(log: &LaunchLog, run_for: Option<Duration>, probe: Option<u32>) -> PlayerParts {
    PlayerParts {
        launcher: Box::new(FakeLauncher {
            log: log.clone(),
            run_for,
            fail: false,
        }),
        probe: Box::new(FixedProbe(probe)),
        resolver: Box::new(TestResolver),
    }
}

pub fn failing_parts() -> PlayerParts {
    PlayerParts {
        launcher: Box::new(FakeLauncher {
            log: LaunchLog::default(),
            run_for: None,
            fail: true,
        }),
        probe: Box::new(FixedProbe(None)),
        resolver: Box::new(TestResolver),
    }
}

/// Reads updates until one matches, giving up after `timeout`.
pub fn wait_for(
    service: &PlayerService,
    timeout: Duration,
    mut matches: impl FnMut(&PlayerUpdate) -> bool,
) -> Option<PlayerUpdate> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if let Some(update) = service.recv_update_timeout(remaining)
            && matches(&update)
        {
            return Some(update);
        }
    }
    None
}

pub fn album() -> Vec<Track> {
    vec![
        Track::new("a", "Opening", "Band", 200),
        Track::new("b", "Middle", "Band", 2),
        Track::new("c", "Closing", "Band", 2),
    ]
}
