use crate::types::{NotationFormat, RenderFormat};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum NotationError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("render error: {0}")]
    Render(String),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Interprets notation text and renders it to a performable file.
///
/// Implementations are black boxes to the repair pipeline: anything they
/// reject is reported per artifact, never propagated across a batch.
pub trait NotationInterpreterPort: Send + Sync {
    type Score;

    fn parse(&self, text: &str, format: NotationFormat) -> Result<Self::Score, NotationError>;

    /// Writes the rendered file to `output_path`.
    fn render(
        &self,
        score: &Self::Score,
        format: RenderFormat,
        output_path: &Path,
    ) -> Result<(), NotationError>;
}
