use rescore_domain_ingest::IngestError;
use rescore_ports::notation::NotationError;
use rescore_ports::types::ErrorKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("conversion failed: {0}")]
    Conversion(#[from] NotationError),
    #[error("failed to write {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Ingest(err) => err.kind(),
            PipelineError::Conversion(_) => ErrorKind::ConversionError,
            PipelineError::OutputWrite { .. } => ErrorKind::OutputWriteFailed,
        }
    }
}

/// Result of running one artifact through the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// Files written, repaired document (if persisted) first.
    Converted { outputs: Vec<PathBuf> },
    Skipped { reason: String },
    Failed { kind: ErrorKind, message: String },
}

impl ConversionOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, ConversionOutcome::Converted { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ConversionOutcome::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<PipelineError> for ConversionOutcome {
    fn from(err: PipelineError) -> Self {
        ConversionOutcome::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
