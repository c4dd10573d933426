use rescore_domain_ingest::ContainerRules;
use rescore_ports::storage::SettingsDto;
use rescore_ports::types::{EncodingPolicy, NotationFormat, RenderFormat};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub encoding: EncodingPolicy,
    /// Write the repaired document next to the input before rendering.
    pub persist_repaired: bool,
    pub rules: ContainerRules,
    pub notation_format: NotationFormat,
    pub render_format: RenderFormat,
}

impl PipelineConfig {
    pub fn from_settings(settings: &SettingsDto) -> Self {
        Self {
            encoding: settings.encoding,
            persist_repaired: settings.persist_repaired,
            rules: ContainerRules::from_settings(settings),
            notation_format: NotationFormat::MusicXml,
            render_format: RenderFormat::Midi,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_settings(&SettingsDto::default())
    }
}
