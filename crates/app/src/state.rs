use std::{fs, path::PathBuf, str::FromStr};

use common::linked_data::{cid_from_str, cid_to_string, Cid};
use common::vault::DEFAULT_SCAN_WINDOW;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "sigvault";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const BLOCKS_DIR_NAME: &str = "blocks";
pub const ROOT_FILE_NAME: &str = "root.cid";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default tracing level, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Device label this vault's exchange key is published under
    #[serde(default = "default_device_label")]
    pub device_label: String,
    /// Share counters probed on recovery: `scan_min..scan_max`
    #[serde(default = "default_scan_min")]
    pub scan_min: u64,
    #[serde(default = "default_scan_max")]
    pub scan_max: u64,
    /// Where blocks live (defaults to the state directory's blocks/)
    #[serde(default)]
    pub blocks_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_device_label() -> String {
    common::share::DEFAULT_DEVICE_LABEL.to_string()
}

fn default_scan_min() -> u64 {
    DEFAULT_SCAN_WINDOW.start
}

fn default_scan_max() -> u64 {
    DEFAULT_SCAN_WINDOW.end
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            device_label: default_device_label(),
            scan_min: default_scan_min(),
            scan_max: default_scan_max(),
            blocks_path: None,
        }
    }
}

impl AppConfig {
    /// The configured level, or WARN if it does not parse
    pub fn tracing_level(&self) -> tracing::Level {
        tracing::Level::from_str(&self.log_level).unwrap_or(tracing::Level::WARN)
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the state directory (~/.sigvault)
    pub dir: PathBuf,
    /// Path to the block directory
    pub blocks_path: PathBuf,
    /// Path to the file holding the latest forest CID
    pub root_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the state directory path (custom or default ~/.sigvault)
    pub fn dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }
        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    fn paths(dir: &PathBuf, config: &AppConfig) -> (PathBuf, PathBuf, PathBuf) {
        let blocks_path = config
            .blocks_path
            .clone()
            .unwrap_or_else(|| dir.join(BLOCKS_DIR_NAME));
        (
            blocks_path,
            dir.join(ROOT_FILE_NAME),
            dir.join(CONFIG_FILE_NAME),
        )
    }

    /// Initialize a new state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let dir = Self::dir(custom_path)?;
        if dir.join(CONFIG_FILE_NAME).exists() {
            return Err(StateError::AlreadyInitialized);
        }
        fs::create_dir_all(&dir)?;

        let config = config.unwrap_or_default();
        let (blocks_path, root_path, config_path) = Self::paths(&dir, &config);
        fs::create_dir_all(&blocks_path)?;
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        Ok(Self {
            dir,
            blocks_path,
            root_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let dir = Self::dir(custom_path)?;
        let config_path = dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::NotInitialized);
        }

        let config: AppConfig = toml::from_str(&fs::read_to_string(&config_path)?)?;
        let (blocks_path, root_path, config_path) = Self::paths(&dir, &config);
        if !blocks_path.exists() {
            return Err(StateError::MissingFile(format!(
                "{}/",
                blocks_path.display()
            )));
        }

        Ok(Self {
            dir,
            blocks_path,
            root_path,
            config_path,
            config,
        })
    }

    /// The forest CID recorded by the last command, if any
    pub fn read_root(&self) -> Result<Option<Cid>, StateError> {
        if !self.root_path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.root_path)?;
        let cid = cid_from_str(raw.trim()).map_err(|e| StateError::InvalidRoot(e.to_string()))?;
        Ok(Some(cid))
    }

    pub fn write_root(&self, cid: &Cid) -> Result<(), StateError> {
        fs::write(&self.root_path, format!("{}\n", cid_to_string(cid)))?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("sigvault directory not initialized. Run 'sigvault init' first")]
    NotInitialized,

    #[error("sigvault directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid root CID: {0}")]
    InvalidRoot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
