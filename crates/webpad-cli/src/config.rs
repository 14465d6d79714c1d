use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use webpad_gateway::DEFAULT_BASE_URL;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const LOG_FILE_NAME: &str = "webpad.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: String,
    pub snapshot_path: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub request_timeout: Duration,
    pub debug: bool,
}

impl Config {
    /// `<log_dir>/webpad.log`, when file logging is configured.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|dir| dir.join(LOG_FILE_NAME))
    }

    /// Filter directive used when `RUST_LOG` is unset.
    pub fn log_level(&self, env: impl Fn(&str) -> Option<String>) -> String {
        if self.debug {
            return "debug".to_string();
        }
        non_blank(env("WEBPAD_LOG_LEVEL")).unwrap_or_else(|| "info".to_string())
    }
}

/// Values given on the command line; they beat everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_base_url: Option<String>,
    pub snapshot_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub debug: bool,
}

/// Optional `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub api_base_url: Option<String>,
    pub snapshot_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub debug: Option<bool>,
}

pub fn load_config(overrides: Overrides) -> Result<Config> {
    let env = |key: &str| std::env::var(key).ok();
    let file = match config_path(&env) {
        Some(path) => load_file(&path)?,
        None => FileConfig::default(),
    };
    Ok(resolve(overrides, file, env))
}

pub fn load_file(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Failed to parse config {}", path.display()))
}

pub fn config_path(env: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(path) = non_blank(env("WEBPAD_CONFIG_PATH")) {
        return Some(PathBuf::from(path));
    }
    let base = non_blank(env("XDG_CONFIG_HOME"))
        .map(PathBuf::from)
        .or_else(dirs::config_dir)?;
    Some(base.join("webpad/config.toml"))
}

/// Flag, then environment, then config file, then defaults.
pub fn resolve(
    overrides: Overrides,
    file: FileConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Config {
    let api_base_url = non_blank(overrides.api_base_url)
        .or_else(|| non_blank(env("WEBPAD_API_BASE_URL")))
        .or_else(|| non_blank(file.api_base_url))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let snapshot_path = overrides
        .snapshot_path
        .or_else(|| non_blank(env("WEBPAD_SNAPSHOT_PATH")).map(PathBuf::from))
        .or(file.snapshot_path)
        .unwrap_or_else(default_snapshot_path);

    let log_dir = overrides
        .log_dir
        .or_else(|| non_blank(env("WEBPAD_LOG_DIR")).map(PathBuf::from))
        .or(file.log_dir);

    let timeout_secs = overrides
        .request_timeout_secs
        .or_else(|| {
            non_blank(env("WEBPAD_REQUEST_TIMEOUT_SECS")).and_then(|value| value.trim().parse().ok())
        })
        .or(file.request_timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let debug = overrides.debug || env_true(&env, "WEBPAD_DEBUG") || file.debug.unwrap_or(false);

    Config {
        api_base_url,
        snapshot_path,
        log_dir,
        request_timeout: Duration::from_secs(timeout_secs),
        debug,
    }
}

fn default_snapshot_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("webpad/session.db")
}

fn env_true(env: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    match env(key) {
        Some(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        None => false,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
