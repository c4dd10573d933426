use crate::container::ContainerRules;
use crate::error::IngestError;
use rescore_ports::types::{ContainerKind, EncodingPolicy};
use std::path::{Path, PathBuf};

/// One input file, classified by extension only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceArtifact {
    path: PathBuf,
    kind: ContainerKind,
    encoding: EncodingPolicy,
}

impl SourceArtifact {
    /// Classifies `path` without touching the filesystem.
    pub fn detect(
        path: impl Into<PathBuf>,
        rules: &ContainerRules,
        encoding: EncodingPolicy,
    ) -> Result<Self, IngestError> {
        let path = path.into();
        let kind = rules.classify(&path).ok_or_else(|| {
            let ext = path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default();
            IngestError::UnsupportedFormat(if ext.is_empty() {
                format!("{} has no file extension", path.display())
            } else {
                format!("'.{ext}' files are not notation documents or archives")
            })
        })?;
        Ok(Self {
            path,
            kind,
            encoding,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn encoding(&self) -> EncodingPolicy {
        self.encoding
    }
}
