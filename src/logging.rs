use crate::config;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Routes the `log` facade into a dated file under the config root.
/// Only called for `--debug`; otherwise nothing is installed and log calls are no-ops.
pub fn init(debug: bool) -> Result<Option<PathBuf>> {
    if !debug {
        return Ok(None);
    }

    let dir = config::ensure_log_dir()?;
    let path = log_file_path(&dir, today());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("logger already initialised")?;

    log::info!("debug logging to {}", path.display());
    Ok(Some(path))
}

fn today() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn log_file_path(dir: &Path, now: OffsetDateTime) -> PathBuf {
    let date = now.date();
    dir.join(format!(
        "ytmusic_{:04}-{:02}-{:02}.log",
        date.year(),
        u8::from(date.month()),
        date.day()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Month};

    #[test]
    fn log_file_is_named_after_the_day() {
        let now = Date::from_calendar_date(2024, Month::March, 7)
            .expect("date")
            .with_hms(23, 59, 0)
            .expect("time")
            .assume_utc();
        let path = log_file_path(Path::new("/tmp/logs"), now);
        assert_eq!(path, Path::new("/tmp/logs/ytmusic_2024-03-07.log"));
    }

    #[test]
    fn disabled_logging_installs_nothing() {
        assert!(init(false).expect("init").is_none());
    }
}
