#[cfg(unix)]
mod ipc;

use crate::config::PlayerConfig;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

/// A running renderer. Owned by the player; polled by its watcher.
pub trait MediaProcess: Send {
    fn id(&self) -> u32;
    fn has_exited(&mut self) -> io::Result<bool>;
    /// Kills the process if it is still running and reaps it.
    fn terminate(&mut self) -> io::Result<()>;
    fn pause(&mut self) -> io::Result<()>;
    fn resume(&mut self) -> io::Result<()>;
}

pub trait MediaLauncher: Send {
    fn launch(&self, url: &str) -> io::Result<Box<dyn MediaProcess>>;
}

/// Starts `mpv` (or a compatible player) with the configured flags.
pub struct MpvLauncher {
    program: String,
    args: Vec<String>,
    ipc_dir: Option<PathBuf>,
    launches: AtomicU64,
}

impl MpvLauncher {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
            ipc_dir: None,
            launches: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        let launcher = Self::new(&config.player_program, &config.player_args);
        if config.ipc_control && cfg!(unix) {
            launcher.with_ipc_dir(std::env::temp_dir())
        } else {
            launcher
        }
    }

    /// Control sockets are created in `dir`, one per launch.
    pub fn with_ipc_dir(mut self, dir: PathBuf) -> Self {
        self.ipc_dir = Some(dir);
        self
    }
}

impl MediaLauncher for MpvLauncher {
    fn launch(&self, url: &str) -> io::Result<Box<dyn MediaProcess>> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let ipc_socket = self.ipc_dir.as_ref().map(|dir| {
            let launch = self.launches.fetch_add(1, Ordering::Relaxed);
            dir.join(format!("ytmusic-mpv-{}-{launch}.sock", std::process::id()))
        });
        if let Some(socket) = &ipc_socket {
            command.arg(format!("--input-ipc-server={}", socket.display()));
        }

        let child = command.arg(url).spawn()?;
        log::debug!("started {} with pid {}", self.program, child.id());
        Ok(Box::new(MpvProcess { child, ipc_socket }))
    }
}

pub struct MpvProcess {
    child: Child,
    ipc_socket: Option<PathBuf>,
}

impl MpvProcess {
    #[cfg(unix)]
    fn set_paused(&mut self, paused: bool) -> io::Result<()> {
        if let Some(socket) = &self.ipc_socket {
            match ipc::set_pause(socket, paused) {
                Ok(()) => return Ok(()),
                Err(err) => log::debug!("ipc pause failed, using signals: {err}"),
            }
        }

        let signal = if paused { libc::SIGSTOP } else { libc::SIGCONT };
        signal_process(self.child.id(), signal)
    }

    #[cfg(not(unix))]
    fn set_paused(&mut self, _paused: bool) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "pausing the media process is not supported on this platform",
        ))
    }

    fn remove_socket(&mut self) {
        if let Some(socket) = self.ipc_socket.take() {
            let _ = std::fs::remove_file(socket);
        }
    }
}

impl MediaProcess for MpvProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn has_exited(&mut self) -> io::Result<bool> {
        Ok(self.child.try_wait()?.is_some())
    }

    fn terminate(&mut self) -> io::Result<()> {
        if self.child.try_wait()?.is_none() {
            self.child.kill()?;
        }
        self.child.wait()?;
        self.remove_socket();
        Ok(())
    }

    fn pause(&mut self) -> io::Result<()> {
        self.set_paused(true)
    }

    fn resume(&mut self) -> io::Result<()> {
        self.set_paused(false)
    }
}

impl Drop for MpvProcess {
    fn drop(&mut self) {
        let _ = self.terminate();
    }
}

#[cfg(unix)]
fn signal_process(pid: u32, signal: libc::c_int) -> io::Result<()> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    let result = unsafe { libc::kill(pid, signal) };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
