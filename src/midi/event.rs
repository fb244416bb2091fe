// MIDI types events

use crate::messaging::command::{Command, NoteEvent};

/// Controller numbers treated as "silence everything"
const CC_ALL_SOUND_OFF: u8 = 120;
const CC_ALL_NOTES_OFF: u8 = 123;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    ControlChange { controller: u8, value: u8 },
}

/// Equal temperament, A4 (note 69) = 440 Hz
#[inline]
pub fn note_to_frequency(note: u8) -> f32 {
    440.0 * 2.0f32.powf((note as f32 - 69.0) / 12.0)
}

impl MidiEvent {
    /// Parse un RAW MIDI message (channel voice messages only)
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        if data.len() < 2 {
            return None;
        }

        match status & 0xF0 {
            0x90 => {
                let (note, velocity) = (data[0], data[1]);
                // Velocity 0 = Note Off
                if velocity == 0 {
                    Some(MidiEvent::NoteOff { note })
                } else {
                    Some(MidiEvent::NoteOn { note, velocity })
                }
            }
            0x80 => Some(MidiEvent::NoteOff { note: data[0] }),
            0xB0 => Some(MidiEvent::ControlChange {
                controller: data[0],
                value: data[1],
            }),
            _ => None,
        }
    }

    /// The render command this event maps to, if any.
    ///
    /// NoteOn and NoteOff for the same note number always produce
    /// bit-identical frequencies, so releases match exactly.
    pub fn to_command(self) -> Option<Command> {
        match self {
            MidiEvent::NoteOn { note, .. } => Some(Command::Note(NoteEvent::NoteOn {
                frequency: note_to_frequency(note),
            })),
            MidiEvent::NoteOff { note } => Some(Command::Note(NoteEvent::NoteOff {
                frequency: note_to_frequency(note),
            })),
            MidiEvent::ControlChange { controller, .. }
                if controller == CC_ALL_SOUND_OFF || controller == CC_ALL_NOTES_OFF =>
            {
                Some(Command::AllNotesOff)
            }
            MidiEvent::ControlChange { .. } => None,
        }
    }
}
