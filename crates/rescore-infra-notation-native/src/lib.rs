use rescore_domain_score::{export_midi_path, import_musicxml_str, MusicXmlImportError, Score};
use rescore_ports::notation::{NotationError, NotationInterpreterPort};
use rescore_ports::types::{NotationFormat, RenderFormat};
use std::path::Path;
use tracing::debug;

/// Interprets MusicXML in-process and renders Standard MIDI Files.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeInterpreter;

impl NativeInterpreter {
    pub fn new() -> Self {
        Self
    }
}

impl NotationInterpreterPort for NativeInterpreter {
    type Score = Score;

    fn parse(&self, text: &str, format: NotationFormat) -> Result<Score, NotationError> {
        match format {
            NotationFormat::MusicXml => {}
        }
        let score = import_musicxml_str(text).map_err(|e| match e {
            MusicXmlImportError::Parse(msg) => NotationError::Parse(msg),
            MusicXmlImportError::Unsupported(msg) => NotationError::UnsupportedFormat(msg),
        })?;
        debug!(
            tracks = score.tracks.len(),
            notes = score.note_count(),
            "parsed notation"
        );
        Ok(score)
    }

    fn render(
        &self,
        score: &Score,
        format: RenderFormat,
        output_path: &Path,
    ) -> Result<(), NotationError> {
        match format {
            RenderFormat::Midi => export_midi_path(score, output_path)
                .map_err(|e| NotationError::Render(e.to_string())),
        }
    }
}
