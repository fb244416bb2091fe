// Types de commandes - Communication producteurs → Audio

use crate::audio::recorder::RecordingSession;

/// A note request from an input source (keyboard or MIDI)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteEvent {
    NoteOn { frequency: f32 },
    NoteOff { frequency: f32 },
}

impl NoteEvent {
    pub fn frequency(&self) -> f32 {
        match *self {
            NoteEvent::NoteOn { frequency } | NoteEvent::NoteOff { frequency } => frequency,
        }
    }
}

/// Everything the render thread consumes, in arrival order
#[derive(Debug)]
pub enum Command {
    Note(NoteEvent),
    AllNotesOff,
    /// Pre-allocated session moved into the audio thread
    StartRecording(RecordingSession),
    /// Processed by the render tick, which then hands the capture back
    StopRecording,
}

impl From<NoteEvent> for Command {
    fn from(event: NoteEvent) -> Self {
        Command::Note(event)
    }
}
