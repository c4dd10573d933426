pub mod midi_export;
pub mod model;
pub mod musicxml_import;

pub use midi_export::*;
pub use model::*;
pub use musicxml_import::*;
