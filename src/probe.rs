use crate::config::PlayerConfig;
use anyhow::{Context, Result};
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Best-effort lookup of a stream's real length in seconds.
pub trait DurationProbe: Send {
    fn probe_duration(&self, url: &str) -> Option<u32>;
}

/// Runs an external tool (`yt-dlp --get-duration` by default) and parses its stdout.
pub struct CommandProbe {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandProbe {
    pub fn new(program: &str, args: &[String], timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
            timeout,
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(
            &config.probe_program,
            &config.probe_args,
            Duration::from_millis(config.probe_timeout_ms),
        )
    }

    /// `Ok(None)` means the tool did not answer in time and was killed.
    fn run(&self, url: &str) -> Result<Option<String>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start {}", self.program))?;

        let mut stdout = child.stdout.take().context("probe stdout not captured")?;
        let (output_tx, output_rx) = mpsc::channel();
        thread::spawn(move || {
            let mut output = String::new();
            let _ = output_tx.send(stdout.read_to_string(&mut output).map(|_| output));
        });

        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait().context("failed to poll probe")? {
                if !status.success() {
                    anyhow::bail!("{} exited with {status}", self.program);
                }
                // A forked helper can keep the pipe open after the tool itself exits.
                let remaining = deadline
                    .saturating_duration_since(Instant::now())
                    .max(POLL_INTERVAL);
                return match output_rx.recv_timeout(remaining) {
                    Ok(output) => Ok(Some(output.context("failed to read probe output")?)),
                    Err(RecvTimeoutError::Timeout) => Ok(None),
                    Err(RecvTimeoutError::Disconnected) => anyhow::bail!("probe reader stopped"),
                };
            }

            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl DurationProbe for CommandProbe {
    fn probe_duration(&self, url: &str) -> Option<u32> {
        match self.run(url) {
            Ok(Some(output)) => {
                let parsed = parse_duration(&output);
                if parsed.is_none() {
                    log::debug!("unusable probe output {:?}", output.trim());
                }
                parsed
            }
            Ok(None) => {
                log::warn!("duration probe timed out after {:?}", self.timeout);
                None
            }
            Err(err) => {
                log::debug!("duration probe failed: {err:#}");
                None
            }
        }
    }
}

/// Never corrects anything; used when no probe tool is configured.
pub struct NoProbe;

impl DurationProbe for NoProbe {
    fn probe_duration(&self, _url: &str) -> Option<u32> {
        None
    }
}

/// Parses `M:SS`, `MM:SS` or `H:MM:SS` into seconds. Zero is not a usable length.
pub fn parse_duration(raw: &str) -> Option<u32> {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    let numbers = parts
        .iter()
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                part.parse::<u32>().ok()
            }
        })
        .collect::<Option<Vec<u32>>>()?;

    let seconds = match numbers.as_slice() {
        [minutes, seconds] if *seconds < 60 && parts[1].len() == 2 => {
            minutes.checked_mul(60)?.checked_add(*seconds)?
        }
        [hours, minutes, seconds]
            if *minutes < 60 && *seconds < 60 && parts[1].len() == 2 && parts[2].len() == 2 =>
        {
            hours
                .checked_mul(3600)?
                .checked_add(minutes * 60)?
                .checked_add(*seconds)?
        }
        _ => return None,
    };

    (seconds > 0).then_some(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_forms() {
        assert_eq!(parse_duration("3:45"), Some(225));
        assert_eq!(parse_duration("03:45\n"), Some(225));
        assert_eq!(parse_duration("12:00"), Some(720));
        assert_eq!(parse_duration("1:23:45"), Some(5025));
    }

    #[test]
    fn rejects_other_output() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("45"), None);
        assert_eq!(parse_duration("3:5"), None);
        assert_eq!(parse_duration("3:75"), None);
        assert_eq!(parse_duration("1:2:3:4"), None);
        assert_eq!(parse_duration("ERROR: video unavailable"), None);
        assert_eq!(parse_duration("-1:30"), None);
        assert_eq!(parse_duration("0:00"), None);
    }

    #[test]
    fn missing_program_yields_no_correction() {
        let probe = CommandProbe::new(
            "ytmusic-definitely-missing-probe",
            &[],
            Duration::from_secs(1),
        );
        assert_eq!(probe.probe_duration("https://example.invalid"), None);
    }

    #[cfg(unix)]
    #[test]
    fn reads_duration_from_tool_stdout() {
        let args = vec![String::from("-c"), String::from("echo 3:45")];
        let probe = CommandProbe::new("sh", &args, Duration::from_secs(5));
        assert_eq!(probe.probe_duration("https://example.invalid"), Some(225));
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_yields_no_correction() {
        let args = vec![String::from("-c"), String::from("echo 3:45; exit 2")];
        let probe = CommandProbe::new("sh", &args, Duration::from_secs(5));
        assert_eq!(probe.probe_duration("https://example.invalid"), None);
    }

    #[cfg(unix)]
    #[test]
    fn hung_tool_is_cut_off() {
        let args = vec![String::from("-c"), String::from("exec sleep 5")];
        let probe = CommandProbe::new("sh", &args, Duration::from_millis(100));
        let started = Instant::now();
        assert_eq!(probe.probe_duration("https://example.invalid"), None);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn output_held_open_by_child_is_cut_off() {
        let args = vec![String::from("-c"), String::from("sleep 5 & echo 3:45")];
        let probe = CommandProbe::new("sh", &args, Duration::from_millis(300));
        let started = Instant::now();
        assert_eq!(probe.probe_duration("https://example.invalid"), None);
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
