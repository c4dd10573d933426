use crate::model::{Score, Track};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use rescore_ports::midi::MidiLikeEvent;
use rescore_ports::types::Tick;
use std::path::Path;

const NOTE_OFF_VELOCITY: u8 = 64;

#[derive(thiserror::Error, Debug)]
pub enum MidiExportError {
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid score: {0}")]
    InvalidScore(String),
}

pub fn export_midi_path(score: &Score, path: &Path) -> Result<(), MidiExportError> {
    let data = export_midi_bytes(score)?;
    std::fs::write(path, data).map_err(|e| MidiExportError::Io(e.to_string()))
}

/// Format 1 file: a conductor track (title, tempo map) followed by one
/// track per part.
pub fn export_midi_bytes(score: &Score) -> Result<Vec<u8>, MidiExportError> {
    if score.tracks.is_empty() {
        return Err(MidiExportError::InvalidScore("no tracks".to_string()));
    }
    if score.ppq == 0 || score.ppq > 0x7FFF {
        return Err(MidiExportError::InvalidScore(format!(
            "ppq {} out of range",
            score.ppq
        )));
    }

    let mut tracks = Vec::with_capacity(score.tracks.len() + 1);
    tracks.push(conductor_track(score));
    for track in &score.tracks {
        tracks.push(part_track(track)?);
    }

    let smf = Smf {
        header: Header {
            format: Format::Parallel,
            timing: Timing::Metrical(u15::new(score.ppq)),
        },
        tracks,
    };

    let mut data = Vec::new();
    smf.write(&mut data)
        .map_err(|e| MidiExportError::Io(e.to_string()))?;
    Ok(data)
}

fn conductor_track(score: &Score) -> Vec<TrackEvent<'_>> {
    let mut timed = Vec::with_capacity(score.tempo_map.len() + 1);
    if let Some(title) = score.meta.title.as_deref() {
        timed.push((0, TrackEventKind::Meta(MetaMessage::TrackName(title.as_bytes()))));
    }
    for point in &score.tempo_map {
        let tempo = u24::new(point.us_per_quarter.min(0x00FF_FFFF));
        timed.push((point.tick, TrackEventKind::Meta(MetaMessage::Tempo(tempo))));
    }
    with_deltas(timed)
}

fn part_track(track: &Track) -> Result<Vec<TrackEvent<'_>>, MidiExportError> {
    if track.channel > 15 {
        return Err(MidiExportError::InvalidScore(format!(
            "track {} uses channel {}",
            track.id, track.channel
        )));
    }
    let channel = u4::new(track.channel);

    let mut timed = Vec::with_capacity(track.events.len() + 1);
    timed.push((
        0,
        TrackEventKind::Meta(MetaMessage::TrackName(track.name.as_bytes())),
    ));
    for event in &track.events {
        let message = match event.event {
            MidiLikeEvent::NoteOn { note, velocity } => MidiMessage::NoteOn {
                key: u7::new(note.min(127)),
                vel: u7::new(velocity.clamp(1, 127)),
            },
            MidiLikeEvent::NoteOff { note } => MidiMessage::NoteOff {
                key: u7::new(note.min(127)),
                vel: u7::new(NOTE_OFF_VELOCITY),
            },
            MidiLikeEvent::ProgramChange { program } => MidiMessage::ProgramChange {
                program: u7::new(program.min(127)),
            },
        };
        timed.push((event.tick, TrackEventKind::Midi { channel, message }));
    }
    Ok(with_deltas(timed))
}

/// Orders absolute-tick events and converts them to delta times, closing
/// the track with end-of-track.
fn with_deltas(mut timed: Vec<(Tick, TrackEventKind<'_>)>) -> Vec<TrackEvent<'_>> {
    timed.sort_by_key(|(tick, _)| *tick);

    let mut events = Vec::with_capacity(timed.len() + 1);
    let mut last_tick: Tick = 0;
    for (tick, kind) in timed {
        let tick = tick.max(last_tick);
        let delta = u32::try_from(tick - last_tick).unwrap_or(u32::MAX);
        last_tick = tick;
        events.push(TrackEvent {
            delta: u28::new(delta.min(0x0FFF_FFFF)),
            kind,
        });
    }
    events.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    events
}
