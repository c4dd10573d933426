use rescore_ports::types::ErrorKind;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("no notation payload in archive: {}", .0.display())]
    NoPayloadFound(PathBuf),
    #[error("corrupt archive {}: {detail}", .path.display())]
    CorruptArchive { path: PathBuf, detail: String },
    #[error("decode error: {0}")]
    Decode(String),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::InputNotFound(_) => ErrorKind::InputNotFound,
            IngestError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            IngestError::NoPayloadFound(_) => ErrorKind::NoPayloadFound,
            IngestError::CorruptArchive { .. } => ErrorKind::CorruptArchive,
            IngestError::Decode(_) => ErrorKind::DecodeError,
        }
    }
}
