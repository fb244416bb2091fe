// Note table - Fixed-capacity polyphony slots
//
// Slots are scanned in index order. Only the render thread touches the
// table, so it needs no locking; nothing here allocates or blocks.

use super::oscillator::{WaveformType, generate_sample};

pub const MAX_NOTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Note {
    frequency: f32,
    /// Seconds since note-on
    phase: f64,
    active: bool,
}

impl Note {
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

pub struct NoteTable {
    notes: [Note; MAX_NOTES],
}

impl NoteTable {
    pub fn new() -> Self {
        Self {
            notes: [Note::default(); MAX_NOTES],
        }
    }

    pub fn capacity(&self) -> usize {
        MAX_NOTES
    }

    /// Claim the first free slot for `frequency`.
    ///
    /// Returns `false` when the request is dropped: either the frequency is
    /// not a positive finite number, or every slot is already sounding.
    /// Sounding notes are never stolen, and an identical frequency that is
    /// already playing still takes a new slot.
    pub fn allocate(&mut self, frequency: f32) -> bool {
        if !frequency.is_finite() || frequency <= 0.0 {
            return false;
        }

        match self.notes.iter_mut().find(|n| !n.active) {
            Some(note) => {
                note.frequency = frequency;
                note.phase = 0.0;
                note.active = true;
                true
            }
            None => false,
        }
    }

    /// Deactivate the first sounding slot whose frequency is exactly
    /// `frequency`. Other slots at the same pitch keep sounding.
    pub fn release(&mut self, frequency: f32) -> bool {
        match self
            .notes
            .iter_mut()
            .find(|n| n.active && n.frequency == frequency)
        {
            Some(note) => {
                note.active = false;
                true
            }
            None => false,
        }
    }

    pub fn release_all(&mut self) {
        for note in &mut self.notes {
            note.active = false;
        }
    }

    /// Sum every sounding note at its current phase, then advance each
    /// phase by `dt` seconds. Returns `(sum, active_count)`.
    #[inline]
    pub fn advance_and_mix(&mut self, dt: f64, waveform: WaveformType) -> (f32, usize) {
        let mut sum = 0.0f32;
        let mut active = 0usize;

        for note in self.notes.iter_mut().filter(|n| n.active) {
            sum += generate_sample(note.frequency, note.phase, waveform);
            note.phase += dt;
            active += 1;
        }

        (sum, active)
    }

    pub fn active_count(&self) -> usize {
        self.notes.iter().filter(|n| n.active).count()
    }

    pub fn active_notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(|n| n.active)
    }
}

impl Default for NoteTable {
    fn default() -> Self {
        Self::new()
    }
}
