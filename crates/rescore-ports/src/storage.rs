use crate::types::EncodingPolicy;
use serde::{Deserialize, Serialize};

fn default_persist_repaired() -> bool {
    true
}

fn default_archive_extensions() -> Vec<String> {
    vec!["mxl".to_string()]
}

fn default_notation_extensions() -> Vec<String> {
    vec!["xml".to_string(), "musicxml".to_string()]
}

fn default_reserved_dirs() -> Vec<String> {
    vec!["META-INF/".to_string()]
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDto {
    pub encoding: EncodingPolicy,
    #[serde(default = "default_persist_repaired")]
    pub persist_repaired: bool,
    #[serde(default = "default_archive_extensions")]
    pub archive_extensions: Vec<String>,
    #[serde(default = "default_notation_extensions")]
    pub notation_extensions: Vec<String>,
    /// Archive directories never searched for a payload, with trailing `/`.
    #[serde(default = "default_reserved_dirs")]
    pub reserved_dirs: Vec<String>,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Self {
            encoding: EncodingPolicy::default(),
            persist_repaired: default_persist_repaired(),
            archive_extensions: default_archive_extensions(),
            notation_extensions: default_notation_extensions(),
            reserved_dirs: default_reserved_dirs(),
        }
    }
}

pub trait StoragePort: Send + Sync {
    fn load_settings(&self) -> Result<SettingsDto, StorageError>;
}
