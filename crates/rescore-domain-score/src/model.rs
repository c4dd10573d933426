use rescore_ports::midi::MidiLikeEvent;
use rescore_ports::types::Tick;
use serde::{Deserialize, Serialize};

pub const DEFAULT_US_PER_QUARTER: u32 = 500_000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoreMeta {
    pub title: Option<String>,
    pub source: ScoreSource,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreSource {
    MusicXml,
    Internal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempoPoint {
    pub tick: Tick,
    pub us_per_quarter: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Score {
    pub meta: ScoreMeta,
    pub ppq: u16,
    pub tempo_map: Vec<TempoPoint>,
    pub tracks: Vec<Track>,
}

/// One notated part, rendered on its own MIDI channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Track {
    pub id: u32,
    pub name: String,
    pub channel: u8, // 0..15
    pub events: Vec<PlaybackMidiEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackMidiEvent {
    pub tick: Tick,
    pub event: MidiLikeEvent,
}

impl Score {
    pub fn new(meta: ScoreMeta, ppq: u16) -> Self {
        Self {
            meta,
            ppq,
            tempo_map: vec![TempoPoint {
                tick: 0,
                us_per_quarter: DEFAULT_US_PER_QUARTER,
            }],
            tracks: Vec::new(),
        }
    }

    pub fn note_count(&self) -> usize {
        self.tracks
            .iter()
            .flat_map(|track| &track.events)
            .filter(|event| matches!(event.event, MidiLikeEvent::NoteOn { .. }))
            .count()
    }
}
