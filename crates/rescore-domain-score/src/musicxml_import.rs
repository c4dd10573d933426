use crate::model::{
    PlaybackMidiEvent, Score, ScoreMeta, ScoreSource, TempoPoint, Track, DEFAULT_US_PER_QUARTER,
};
use rescore_ports::midi::MidiLikeEvent;
use rescore_ports::types::Tick;
use roxmltree::{Document, Node, ParsingOptions};
use std::collections::{BTreeMap, HashMap};

pub const IMPORT_PPQ: u16 = 480;
const DEFAULT_VELOCITY: u8 = 90;
const PERCUSSION_CHANNEL: u8 = 9;
/// Upper bound for any time position in a part; no real score comes close.
const MAX_TICK: Tick = 1 << 40;

#[derive(thiserror::Error, Debug)]
pub enum MusicXmlImportError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unsupported feature: {0}")]
    Unsupported(String),
}

#[derive(Clone, Debug, Default)]
struct PartInfo {
    name: Option<String>,
    channel: Option<u8>,
    program: Option<u8>,
}

#[derive(Clone, Copy, Debug)]
struct NoteSpan {
    tick: Tick,
    duration: Tick,
    note: u8,
    velocity: u8,
}

/// Imports a partwise MusicXML document. DTDs are accepted (OMR output
/// nearly always carries a DOCTYPE), external entities are not resolved.
pub fn import_musicxml_str(xml: &str) -> Result<Score, MusicXmlImportError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(xml, options)
        .map_err(|e| MusicXmlImportError::Parse(e.to_string()))?;
    let root = doc.root_element();
    match root.tag_name().name() {
        "score-partwise" => {}
        "score-timewise" => {
            return Err(MusicXmlImportError::Unsupported(
                "score-timewise documents".to_string(),
            ))
        }
        other => {
            return Err(MusicXmlImportError::Parse(format!(
                "unexpected root element <{other}>"
            )))
        }
    }

    let title = ["work-title", "movement-title"].iter().find_map(|name| {
        root.descendants()
            .find(|node| node.has_tag_name(*name))
            .and_then(|node| node.text())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    });

    let part_infos = read_part_list(root);
    let mut tempo_points: BTreeMap<Tick, u32> = BTreeMap::new();
    let mut tracks = Vec::new();

    for (index, part) in root
        .children()
        .filter(|node| node.has_tag_name("part"))
        .enumerate()
    {
        let id = part.attribute("id").unwrap_or_default();
        let info = part_infos.get(id).cloned().unwrap_or_default();

        let mut cursor = PartCursor::new(IMPORT_PPQ);
        for measure in part.children().filter(|node| node.has_tag_name("measure")) {
            cursor.read_measure(measure, &mut tempo_points)?;
        }

        let mut notes = cursor.notes;
        resolve_overlaps(&mut notes);
        tracks.push(Track {
            id: index as u32,
            name: info.name.unwrap_or_else(|| id.to_string()),
            channel: info.channel.unwrap_or_else(|| default_channel(index)),
            events: build_events(&notes, info.program),
        });
    }

    if tracks.is_empty() {
        return Err(MusicXmlImportError::Parse(
            "document has no <part> elements".to_string(),
        ));
    }

    let mut score = Score::new(
        ScoreMeta {
            title,
            source: ScoreSource::MusicXml,
        },
        IMPORT_PPQ,
    );
    score.tempo_map = build_tempo_map(tempo_points);
    score.tracks = tracks;
    Ok(score)
}

/// Walks one part measure by measure, tracking the time cursor.
struct PartCursor {
    ppq: u16,
    divisions: i64,
    position: Tick,
    last_onset: Option<Tick>,
    velocity: u8,
    open_ties: HashMap<u8, usize>,
    notes: Vec<NoteSpan>,
}

impl PartCursor {
    fn new(ppq: u16) -> Self {
        Self {
            ppq,
            divisions: 1,
            position: 0,
            last_onset: None,
            velocity: DEFAULT_VELOCITY,
            open_ties: HashMap::new(),
            notes: Vec::new(),
        }
    }

    fn read_measure(
        &mut self,
        measure: Node,
        tempo_points: &mut BTreeMap<Tick, u32>,
    ) -> Result<(), MusicXmlImportError> {
        let start = self.position;
        let mut end = start;
        self.last_onset = None;

        for element in measure.children().filter(|node| node.is_element()) {
            match element.tag_name().name() {
                "attributes" => {
                    if let Some(divisions) = child_text(element, "divisions")
                        .and_then(|text| text.trim().parse::<i64>().ok())
                    {
                        self.divisions = divisions.max(1);
                    }
                }
                "direction" => self.read_direction(element, tempo_points),
                "sound" => self.read_sound(element, tempo_points),
                "backup" => {
                    let back = self.duration_of(element)?;
                    self.position = (self.position - back).max(start);
                    self.last_onset = None;
                }
                "forward" => {
                    self.position = advance(self.position, self.duration_of(element)?)?;
                    self.last_onset = None;
                }
                "note" => self.read_note(element)?,
                _ => {}
            }
            end = end.max(self.position);
        }

        self.position = end;
        Ok(())
    }

    fn read_direction(&mut self, direction: Node, tempo_points: &mut BTreeMap<Tick, u32>) {
        for sound in direction.children().filter(|node| node.has_tag_name("sound")) {
            self.read_sound(sound, tempo_points);
        }
        let marks = direction
            .children()
            .filter(|node| node.has_tag_name("direction-type"))
            .flat_map(|node| node.children())
            .filter(|node| node.has_tag_name("dynamics"))
            .flat_map(|node| node.children())
            .filter(|node| node.is_element());
        for mark in marks {
            let name = match mark.tag_name().name() {
                "other-dynamics" => mark.text().unwrap_or_default(),
                name => name,
            };
            if let Some(velocity) = dynamics_velocity(name) {
                self.velocity = velocity;
            }
        }
    }

    fn read_sound(&mut self, sound: Node, tempo_points: &mut BTreeMap<Tick, u32>) {
        if let Some(bpm) = sound
            .attribute("tempo")
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|bpm| *bpm > 0.0)
        {
            tempo_points.insert(self.position, (60_000_000.0 / bpm).round() as u32);
        }
        // Percentage of the forte velocity (90).
        if let Some(percent) = sound
            .attribute("dynamics")
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|percent| *percent >= 0.0)
        {
            let velocity = (f64::from(DEFAULT_VELOCITY) * percent / 100.0).round();
            self.velocity = velocity.clamp(1.0, 127.0) as u8;
        }
    }

    fn read_note(&mut self, note: Node) -> Result<(), MusicXmlImportError> {
        if has_child(note, "grace") {
            return Ok(());
        }
        let is_chord = has_child(note, "chord");
        let onset = if is_chord {
            self.last_onset.unwrap_or(self.position)
        } else {
            self.position
        };

        let mut duration = self.duration_of(note)?;
        if duration == 0 {
            duration = infer_duration(note, self.ppq).unwrap_or(0);
        }
        if !is_chord {
            self.last_onset = Some(onset);
            self.position = advance(self.position, duration)?;
        }

        if has_child(note, "rest") {
            return Ok(());
        }
        let Some(pitch) = parse_pitch(note) else {
            return Ok(());
        };

        let (tie_start, tie_stop) = tie_flags(note);
        let length = duration.max(1);
        if tie_stop {
            if let Some(&idx) = self.open_ties.get(&pitch) {
                let span = &mut self.notes[idx];
                span.duration = span.duration.max(onset + length - span.tick);
                if !tie_start {
                    self.open_ties.remove(&pitch);
                }
                return Ok(());
            }
        }

        let idx = self.notes.len();
        self.notes.push(NoteSpan {
            tick: onset,
            duration: length,
            note: pitch,
            velocity: self.velocity,
        });
        if tie_start {
            self.open_ties.insert(pitch, idx);
        }
        Ok(())
    }

    fn duration_of(&self, node: Node) -> Result<Tick, MusicXmlImportError> {
        let Some(text) = child_text(node, "duration").map(str::trim) else {
            return Ok(0);
        };
        let duration = text.parse::<f64>().unwrap_or(0.0);
        if duration <= 0.0 {
            return Ok(0);
        }
        let ticks = (duration * f64::from(self.ppq) / self.divisions as f64).round();
        if ticks.is_nan() || ticks > MAX_TICK as f64 {
            return Err(MusicXmlImportError::Parse(format!(
                "duration {text} is out of range"
            )));
        }
        Ok((ticks as Tick).max(1))
    }
}

/// Moves a time position forward, keeping it within `MAX_TICK`.
fn advance(position: Tick, delta: Tick) -> Result<Tick, MusicXmlImportError> {
    position
        .checked_add(delta)
        .filter(|tick| *tick <= MAX_TICK)
        .ok_or_else(|| {
            MusicXmlImportError::Parse(format!("time position exceeds {MAX_TICK} ticks"))
        })
}

fn read_part_list(root: Node) -> HashMap<String, PartInfo> {
    let mut infos = HashMap::new();
    for score_part in root
        .descendants()
        .filter(|node| node.has_tag_name("score-part"))
    {
        let Some(id) = score_part.attribute("id") else {
            continue;
        };
        let instrument = score_part
            .children()
            .find(|node| node.has_tag_name("midi-instrument"));
        let midi_value = |name: &str| {
            instrument
                .and_then(|node| child_text(node, name))
                .and_then(|text| text.trim().parse::<u16>().ok())
        };
        infos.insert(
            id.to_string(),
            PartInfo {
                name: child_text(score_part, "part-name")
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
                channel: midi_value("midi-channel")
                    .filter(|ch| (1..=16).contains(ch))
                    .map(|ch| (ch - 1) as u8),
                program: midi_value("midi-program")
                    .filter(|p| (1..=128).contains(p))
                    .map(|p| (p - 1) as u8),
            },
        );
    }
    infos
}

/// Parts without an explicit channel get 0, 1, 2 ... skipping percussion.
fn default_channel(part_index: usize) -> u8 {
    let channel = (part_index % 15) as u8;
    if channel >= PERCUSSION_CHANNEL {
        channel + 1
    } else {
        channel
    }
}

fn child_text<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|child| child.has_tag_name(name))
        .and_then(|child| child.text())
}

fn has_child(node: Node, name: &str) -> bool {
    node.children().any(|child| child.has_tag_name(name))
}

fn parse_pitch(note: Node) -> Option<u8> {
    let pitch = note.children().find(|node| node.has_tag_name("pitch"))?;
    let base = match child_text(pitch, "step")?.trim() {
        "C" => 0,
        "D" => 2,
        "E" => 4,
        "F" => 5,
        "G" => 7,
        "A" => 9,
        "B" => 11,
        _ => return None,
    };
    let octave = child_text(pitch, "octave")?
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|octave| (-1..=10).contains(octave))?;
    // Microtonal alters are rounded to the nearest semitone.
    let alter = child_text(pitch, "alter")
        .and_then(|text| text.trim().parse::<f64>().ok())
        .map(|alter| alter.round().clamp(-12.0, 12.0) as i32)
        .unwrap_or(0);

    let midi = (octave + 1) * 12 + base + alter;
    u8::try_from(midi).ok().filter(|midi| *midi <= 127)
}

fn tie_flags(note: Node) -> (bool, bool) {
    let mut start = false;
    let mut stop = false;
    let direct = note.children().filter(|node| node.has_tag_name("tie"));
    let notated = note
        .children()
        .filter(|node| node.has_tag_name("notations"))
        .flat_map(|node| node.children())
        .filter(|node| node.has_tag_name("tied"));
    for tie in direct.chain(notated) {
        match tie.attribute("type").map(str::trim) {
            Some("start") => start = true,
            Some("stop") => stop = true,
            _ => {}
        }
    }
    (start, stop)
}

/// Duration from `<type>`, dots and tuplet ratio, for notes that omit
/// `<duration>` (common in OMR output).
fn infer_duration(note: Node, ppq: u16) -> Option<Tick> {
    let quarter = Tick::from(ppq);
    let base = match child_text(note, "type")?.trim() {
        "breve" => quarter * 8,
        "whole" => quarter * 4,
        "half" => quarter * 2,
        "quarter" => quarter,
        "eighth" => quarter / 2,
        "16th" => quarter / 4,
        "32nd" => quarter / 8,
        "64th" => quarter / 16,
        "128th" => quarter / 32,
        _ => return None,
    };

    let dots = note.children().filter(|node| node.has_tag_name("dot")).count();
    let mut total = base;
    let mut extra = base / 2;
    for _ in 0..dots {
        total += extra;
        extra /= 2;
    }

    if let Some(modification) = note
        .children()
        .find(|node| node.has_tag_name("time-modification"))
    {
        let ratio = |name: &str| {
            child_text(modification, name)
                .and_then(|text| text.trim().parse::<Tick>().ok())
                .filter(|value| (1..=Tick::from(u16::MAX)).contains(value))
        };
        if let (Some(actual), Some(normal)) = (ratio("actual-notes"), ratio("normal-notes")) {
            total = (total * normal + actual / 2) / actual;
        }
    }

    Some(total.max(1))
}

fn dynamics_velocity(mark: &str) -> Option<u8> {
    let velocity = match mark.trim().trim_end_matches('.').to_ascii_lowercase().as_str() {
        "pppp" => 16,
        "ppp" => 24,
        "pp" => 34,
        "p" => 46,
        "mp" => 58,
        "mf" => 74,
        "f" => 92,
        "ff" => 108,
        "fff" => 120,
        "ffff" => 127,
        "sf" | "sfz" | "fz" => 112,
        _ => return None,
    };
    Some(velocity)
}

/// Drops duplicate onsets of one pitch and shortens a note that would still
/// sound when the same pitch strikes again.
fn resolve_overlaps(notes: &mut Vec<NoteSpan>) {
    notes.sort_by(|a, b| {
        a.note
            .cmp(&b.note)
            .then(a.tick.cmp(&b.tick))
            .then(b.duration.cmp(&a.duration))
    });
    notes.dedup_by(|later, earlier| later.note == earlier.note && later.tick == earlier.tick);

    for idx in 1..notes.len() {
        let (head, tail) = notes.split_at_mut(idx);
        let prev = &mut head[idx - 1];
        let next = &tail[0];
        if prev.note == next.note && prev.tick + prev.duration > next.tick {
            prev.duration = (next.tick - prev.tick).max(1);
        }
    }
}

fn build_events(notes: &[NoteSpan], program: Option<u8>) -> Vec<PlaybackMidiEvent> {
    let mut events = Vec::with_capacity(notes.len() * 2 + 1);
    if let Some(program) = program {
        events.push(PlaybackMidiEvent {
            tick: 0,
            event: MidiLikeEvent::ProgramChange { program },
        });
    }
    for span in notes {
        events.push(PlaybackMidiEvent {
            tick: span.tick,
            event: MidiLikeEvent::NoteOn {
                note: span.note,
                velocity: span.velocity.max(1),
            },
        });
        events.push(PlaybackMidiEvent {
            tick: span.tick + span.duration,
            event: MidiLikeEvent::NoteOff { note: span.note },
        });
    }
    events.sort_by_key(|event| (event.tick, event_rank(&event.event)));
    events
}

fn event_rank(event: &MidiLikeEvent) -> (u8, u8) {
    match event {
        MidiLikeEvent::ProgramChange { .. } => (0, 0),
        MidiLikeEvent::NoteOff { note } => (1, *note),
        MidiLikeEvent::NoteOn { note, .. } => (2, *note),
    }
}

fn build_tempo_map(tempo_points: BTreeMap<Tick, u32>) -> Vec<TempoPoint> {
    let mut map: Vec<TempoPoint> = tempo_points
        .into_iter()
        .map(|(tick, us_per_quarter)| TempoPoint {
            tick,
            us_per_quarter,
        })
        .collect();
    if map.first().map_or(true, |point| point.tick != 0) {
        map.insert(
            0,
            TempoPoint {
                tick: 0,
                us_per_quarter: DEFAULT_US_PER_QUARTER,
            },
        );
    }
    map
}
