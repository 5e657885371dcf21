// Configuration management for Tunewell
// Handles loading/saving settings, with sensible defaults when config is missing

use anyhow::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::queue::DEFAULT_RESTART_THRESHOLD_SECS;
use crate::behavior::tracker::{DEFAULT_MOST_PLAYED_LIMIT, DEFAULT_RECENTLY_PLAYED_LIMIT};
use crate::storage::{JsonFileStore, KeyValueStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub music_directories: Vec<PathBuf>,
    /// Where persisted state lives
    pub data_dir: PathBuf,
    pub storage: StorageConfig,
    pub playback: PlaybackConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// "Previous" restarts the track instead once this far in
    pub restart_threshold_secs: f64,
    pub recently_played_limit: usize,
    pub most_played_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    /// EnvFilter directive, overridden by RUST_LOG
    pub filter: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            restart_threshold_secs: DEFAULT_RESTART_THRESHOLD_SECS,
            recently_played_limit: DEFAULT_RECENTLY_PLAYED_LIMIT,
            most_played_limit: DEFAULT_MOST_PLAYED_LIMIT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: app_dir().join("logs"),
            filter: "info,tunewell=debug".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            music_directories: vec![
                dirs::audio_dir().unwrap_or_else(|| PathBuf::from("~/Music")),
            ],
            data_dir: app_dir().join("data"),
            storage: StorageConfig::default(),
            playback: PlaybackConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load from the default location, writing the defaults there on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(Self::config_path()?)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("tunewell");

        Ok(config_dir.join("config.toml"))
    }

    /// Open the configured persistence backend under `data_dir`
    pub fn open_store(&self) -> Result<Box<dyn KeyValueStore>> {
        match self.storage.backend {
            StorageBackend::Json => Ok(Box::new(JsonFileStore::new(&self.data_dir)?)),
            #[cfg(feature = "sqlite")]
            StorageBackend::Sqlite => {
                fs::create_dir_all(&self.data_dir)?;
                let store = crate::storage::SqliteStore::new(self.data_dir.join("tunewell.db"))?;
                Ok(Box::new(store))
            }
            #[cfg(not(feature = "sqlite"))]
            StorageBackend::Sqlite => {
                anyhow::bail!("SQLite storage requested but tunewell was built without the `sqlite` feature")
            }
        }
    }
}

fn app_dir() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tunewell")
}
