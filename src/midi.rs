//! MIDI assembly and export
//!
//! [`assemble`] turns note-level and global parameters into a fully
//! parameterized score; byte-level encoding is delegated to `midly`.

use crate::config::MidiConfig;
use crate::error::{EegError, Result};
use crate::mapper::{GlobalParameters, NoteParameters};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, TrackEvent, TrackEventKind};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One fully parameterized note in score order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreNote {
    pub pitch: u8,
    pub velocity: u8,
    pub duration_ticks: u32,
}

/// Ordered event list plus metadata, ready for byte encoding
#[derive(Debug, Clone, PartialEq)]
pub struct MidiScore {
    pub tempo_bpm: u32,
    pub key_label: String,
    pub ticks_per_beat: u16,
    pub program: u8,
    pub notes: Vec<ScoreNote>,
}

/// A decoded note event, used by the CSV dump and round-trip tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedNote {
    pub pitch: u8,
    pub velocity: u8,
    pub start_tick: u32,
    pub end_tick: u32,
}

/// Metadata recovered from an encoded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedScore {
    pub tempo_uspq: u32,
    pub key_label: Option<String>,
    pub notes: Vec<DecodedNote>,
}

/// Build the score from per-note and global parameters.
///
/// Velocity is uniform across the piece: overall recording intensity
/// (average beta + gamma) modulates loudness, not per-note dynamics.
pub fn assemble(
    notes: &[NoteParameters],
    globals: &GlobalParameters,
    config: &MidiConfig,
) -> Result<MidiScore> {
    if notes.is_empty() {
        return Err(EegError::InputError(
            "no note parameters to assemble".to_string(),
        ));
    }

    let dynamic_factor = 1.0 + (globals.averages.beta + globals.averages.gamma) / 2.0;
    let velocity = (config.base_velocity as f64 * dynamic_factor)
        .round()
        .clamp(0.0, 127.0) as u8;

    let score_notes = notes
        .iter()
        .map(|n| ScoreNote {
            pitch: n.pitch,
            velocity,
            duration_ticks: (n.duration * config.ticks_per_beat as f64).round() as u32,
        })
        .collect();

    Ok(MidiScore {
        tempo_bpm: globals.tempo,
        key_label: globals.key.label().to_string(),
        ticks_per_beat: config.ticks_per_beat,
        program: config.program,
        notes: score_notes,
    })
}

/// Encode the score as a standard MIDI file (format 1, two tracks)
pub fn encode(score: &MidiScore) -> Result<Vec<u8>> {
    if score.tempo_bpm == 0 {
        return Err(EegError::MidiError("zero tempo".to_string()));
    }
    let tempo_uspq = 60_000_000 / score.tempo_bpm;
    let key_text = format!("Key: {}", score.key_label);

    // Metadata track: tempo, time signature, key label, all at time 0
    let meta_track = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_uspq))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8)),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Text(key_text.as_bytes())),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ];

    let mut note_track = Vec::with_capacity(score.notes.len() * 2 + 3);
    note_track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(b"EEG-Generated Notes")),
    });
    note_track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::ProgramChange {
                program: u7::new(score.program),
            },
        },
    });

    for note in &score.notes {
        note_track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOn {
                    key: u7::new(note.pitch),
                    vel: u7::new(note.velocity),
                },
            },
        });
        note_track.push(TrackEvent {
            delta: u28::new(note.duration_ticks),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOff {
                    key: u7::new(note.pitch),
                    vel: u7::new(note.velocity),
                },
            },
        });
    }

    note_track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let header = Header {
        format: Format::Parallel,
        timing: midly::Timing::Metrical(u15::new(score.ticks_per_beat)),
    };

    let smf = Smf {
        header,
        tracks: vec![meta_track, note_track],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| EegError::MidiError(format!("failed to write MIDI data: {:?}", e)))?;
    Ok(bytes)
}

/// Encode and write the score to disk
pub fn write_midi(score: &MidiScore, path: &Path) -> Result<Vec<u8>> {
    let bytes = encode(score)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    Ok(bytes)
}

/// Parse an encoded file back into note events and metadata
pub fn decode_notes(bytes: &[u8]) -> Result<DecodedScore> {
    let smf = Smf::parse(bytes)
        .map_err(|e| EegError::MidiError(format!("failed to parse MIDI data: {:?}", e)))?;

    let mut tempo_uspq = 0u32;
    let mut key_label = None;
    let mut notes = Vec::new();

    for track in &smf.tracks {
        let mut current_tick = 0u32;
        // (pitch, velocity, start tick) of notes awaiting their note-off
        let mut pending: Vec<(u8, u8, u32)> = Vec::new();

        for event in track {
            current_tick += event.delta.as_int();
            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(value)) => {
                    tempo_uspq = value.as_int();
                }
                TrackEventKind::Meta(MetaMessage::Text(text)) => {
                    let text = String::from_utf8_lossy(text);
                    if let Some(label) = text.strip_prefix("Key: ") {
                        key_label = Some(label.to_string());
                    }
                }
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { key, vel },
                    ..
                } => {
                    pending.push((key.as_int(), vel.as_int(), current_tick));
                }
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOff { key, .. },
                    ..
                } => {
                    if let Some(pos) = pending.iter().position(|(p, _, _)| *p == key.as_int()) {
                        let (pitch, velocity, start_tick) = pending.remove(pos);
                        notes.push(DecodedNote {
                            pitch,
                            velocity,
                            start_tick,
                            end_tick: current_tick,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    notes.sort_by_key(|n| n.start_tick);

    Ok(DecodedScore {
        tempo_uspq,
        key_label,
        notes,
    })
}
