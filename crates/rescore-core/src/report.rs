use crate::outcome::ConversionOutcome;
use rescore_ports::storage::StorageError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub input: PathBuf,
    #[serde(flatten)]
    pub outcome: ConversionOutcome,
}

/// Outcomes of one batch, in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub artifacts: Vec<ArtifactReport>,
}

impl BatchReport {
    pub fn converted(&self) -> usize {
        self.count(|outcome| matches!(outcome, ConversionOutcome::Converted { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, ConversionOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, ConversionOutcome::Skipped { .. }))
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &ConversionOutcome> {
        self.artifacts.iter().map(|artifact| &artifact.outcome)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        let data =
            serde_json::to_vec_pretty(self).map_err(|e| StorageError::Serde(e.to_string()))?;
        fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
    }

    fn count(&self, predicate: impl Fn(&ConversionOutcome) -> bool) -> usize {
        self.outcomes().filter(|outcome| predicate(outcome)).count()
    }
}
