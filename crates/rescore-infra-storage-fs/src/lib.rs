use rescore_ports::storage::{SettingsDto, StorageError, StoragePort};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";

/// Reads pipeline settings from a JSON file.
pub struct FsStorage {
    settings_path: PathBuf,
}

impl FsStorage {
    /// Settings live in `<base_dir>/settings.json`.
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            settings_path: base_dir.join(SETTINGS_FILE),
        }
    }

    /// An explicit settings file, which must exist.
    pub fn from_file(path: PathBuf) -> Result<Self, StorageError> {
        if !path.is_file() {
            return Err(StorageError::Io(format!(
                "settings file not found: {}",
                path.display()
            )));
        }
        Ok(Self {
            settings_path: path,
        })
    }

    pub fn default_base_dir() -> Result<PathBuf, StorageError> {
        let base = dirs_next::config_dir()
            .ok_or_else(|| StorageError::Io("config dir not found".to_string()))?;
        Ok(base.join("rescore"))
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
        let data = fs::read(path).map_err(|e| StorageError::Io(e.to_string()))?;
        serde_json::from_slice(&data).map_err(|e| StorageError::Serde(e.to_string()))
    }
}

impl Default for FsStorage {
    fn default() -> Self {
        let base_dir = Self::default_base_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(base_dir)
    }
}

impl StoragePort for FsStorage {
    fn load_settings(&self) -> Result<SettingsDto, StorageError> {
        if !self.settings_path.exists() {
            return Ok(SettingsDto::default());
        }
        Self::read_json(&self.settings_path)
    }
}
