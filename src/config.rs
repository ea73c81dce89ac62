use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "ytmusic";
const CONFIG_FILE: &str = "config.json";
const LOG_DIR: &str = "logs";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerConfig {
    #[serde(default = "default_player_program")]
    pub player_program: String,
    #[serde(default = "default_player_args")]
    pub player_args: Vec<String>,
    /// Ask the renderer for an IPC socket and pause through it (unix only).
    #[serde(default = "default_ipc_control")]
    pub ipc_control: bool,
    #[serde(default = "default_probe_program")]
    pub probe_program: String,
    #[serde(default = "default_probe_args")]
    pub probe_args: Vec<String>,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
    #[serde(default = "default_stream_url_base")]
    pub stream_url_base: String,
    #[serde(default)]
    pub library_file: Option<PathBuf>,
}

fn default_player_program() -> String {
    String::from("mpv")
}

fn default_player_args() -> Vec<String> {
    vec![String::from("--no-video"), String::from("--no-terminal")]
}

fn default_ipc_control() -> bool {
    true
}

fn default_probe_program() -> String {
    String::from("yt-dlp")
}

fn default_probe_args() -> Vec<String> {
    vec![String::from("--get-duration")]
}

fn default_probe_timeout_ms() -> u64 {
    10_000
}

fn default_tick_interval_ms() -> u64 {
    1_000
}

fn default_watch_interval_ms() -> u64 {
    100
}

fn default_stream_url_base() -> String {
    String::from("https://www.youtube.com/watch?v=")
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            player_program: default_player_program(),
            player_args: default_player_args(),
            ipc_control: default_ipc_control(),
            probe_program: default_probe_program(),
            probe_args: default_probe_args(),
            probe_timeout_ms: default_probe_timeout_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            watch_interval_ms: default_watch_interval_ms(),
            stream_url_base: default_stream_url_base(),
            library_file: None,
        }
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("YTMUSIC_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

pub fn ensure_log_dir() -> Result<PathBuf> {
    let dir = ensure_config_dir()?.join(LOG_DIR);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(dir)
}

pub fn load_config() -> Result<PlayerConfig> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<PlayerConfig> {
    if !path.exists() {
        return Ok(PlayerConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: PlayerConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(config)
}

pub fn save_config(config: &PlayerConfig) -> Result<()> {
    ensure_config_dir()?;
    let path = config_path()?;
    let json = serde_json::to_string_pretty(config)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().expect("tempdir");
        unsafe {
            env::set_var("YTMUSIC_CONFIG_DIR", dir.path().to_string_lossy().as_ref());
        }

        let config = PlayerConfig {
            player_program: String::from("mpv-custom"),
            probe_timeout_ms: 2_500,
            ..PlayerConfig::default()
        };
        save_config(&config).expect("save");
        let loaded = load_config().expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().expect("tempdir");
        let loaded = load_config_from(&dir.path().join("absent.json")).expect("load");
        assert_eq!(loaded, PlayerConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"tick_interval_ms": 250, "ipc_control": false}"#).expect("write");

        let loaded = load_config_from(&path).expect("load");
        assert_eq!(loaded.tick_interval_ms, 250);
        assert!(!loaded.ipc_control);
        assert_eq!(loaded.player_program, "mpv");
        assert_eq!(loaded.probe_args, vec![String::from("--get-duration")]);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").expect("write");

        let err = load_config_from(&path).expect_err("should fail");
        assert!(format!("{err:#}").contains("config.json"));
    }
}
