use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::depth::domain::depth_range::DepthRange;
use crate::shared::constants::{
    DEFAULT_CAPTURE_FPS, DEFAULT_CONTAINER, DEFAULT_FILE_PREFIX, DEFAULT_MAX_DEPTH_METERS,
    DEFAULT_MIN_DEPTH_METERS, DEFAULT_SAMPLE_QUEUE_CAPACITY, SETTINGS_DIR_NAME,
    SETTINGS_FILE_NAME,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("could not determine config directory")]
    NoConfigDir,
}

/// Recording configuration, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub fps: u32,
    pub min_depth: f32,
    pub max_depth: f32,
    /// Directory for recordings. `None` means the system temp dir.
    pub output_dir: Option<PathBuf>,
    pub file_prefix: String,
    pub container: String,
    pub queue_capacity: usize,
    pub depth_filtering: bool,
    /// When set, the first composite frame is also saved as an image here.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            fps: DEFAULT_CAPTURE_FPS,
            min_depth: DEFAULT_MIN_DEPTH_METERS,
            max_depth: DEFAULT_MAX_DEPTH_METERS,
            output_dir: None,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            container: DEFAULT_CONTAINER.to_string(),
            queue_capacity: DEFAULT_SAMPLE_QUEUE_CAPACITY,
            depth_filtering: true,
            snapshot_path: None,
        }
    }
}

impl CaptureSettings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// Loads from the user config dir, falling back to defaults on any error.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable settings: {e}");
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::config_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn depth_range(&self) -> DepthRange {
        DepthRange::new(self.min_depth, self.max_depth)
    }

    pub fn fps(&self) -> u32 {
        self.fps.max(1)
    }

    /// A fresh, timestamped output path for one recording.
    pub fn next_output_path(&self) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let dir = self.output_dir.clone().unwrap_or_else(std::env::temp_dir);
        dir.join(format!("{}_{millis}.{}", self.file_prefix, self.container))
    }
}
