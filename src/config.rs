//! Application configuration, loaded from a TOML file with env-var
//! overrides for the file location.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Minimum clone length, in lines, when neither the config file nor the
/// project overrides it.
pub const DEFAULT_MIN_CLONE_LENGTH: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Root directory for local clones. Defaults to `<data dir>/workspace`.
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
    /// Database file. Defaults to the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_min_clone_length")]
    pub min_clone_length: usize,
}

fn default_min_clone_length() -> usize {
    DEFAULT_MIN_CLONE_LENGTH
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            workspace_root: None,
            database_path: None,
            min_clone_length: DEFAULT_MIN_CLONE_LENGTH,
        }
    }
}

impl WatchConfig {
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| data_dir().join("workspace"))
    }
}

pub fn load_config() -> WatchConfig {
    let path = config_path();
    let Ok(contents) = std::fs::read_to_string(&path) else {
        return WatchConfig::default();
    };
    toml::from_str(&contents).unwrap_or_default()
}

pub fn save_config(config: &WatchConfig) -> std::io::Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = toml::to_string_pretty(config).unwrap_or_default();
    std::fs::write(path, contents)
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("CLONEWATCH_CONFIG_PATH") {
        return PathBuf::from(path);
    }

    data_dir().join("config.toml")
}

fn data_dir() -> PathBuf {
    if let Ok(path) = std::env::var("CLONEWATCH_DATA_HOME") {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = home::home_dir() {
            return home
                .join("Library")
                .join("Application Support")
                .join("clonewatch");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(xdg) = std::env::var_os("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("clonewatch");
        }
        if let Some(home) = home::home_dir() {
            return home.join(".local").join("share").join("clonewatch");
        }
    }

    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".clonewatch")
}
