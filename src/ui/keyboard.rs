// Keyboard controller - Clavier d'ordinateur → événements de notes
//
// Polled once per UI frame: the current key snapshot is diffed against the
// previous one, so every edge (press, release) is detected here rather
// than in process-wide statics. Each held note key remembers the exact
// frequency it started, and releases with that same value even if the
// octave changed in between.

use crate::audio::parameters::SynthState;
use crate::messaging::command::NoteEvent;
use crate::synth::oscillator::WaveformType;

/// Volume change per poll while +/- is held
pub const VOLUME_STEP: f32 = 0.01;

/// Key label and base frequency (octave shift 0), white and black keys
/// from C4 to C5
pub const NOTE_KEYS: [(char, f32); 13] = [
    ('A', 261.63),
    ('W', 277.18),
    ('S', 293.66),
    ('E', 311.13),
    ('D', 329.63),
    ('F', 349.23),
    ('T', 369.99),
    ('G', 392.00),
    ('Y', 415.30),
    ('H', 440.00),
    ('U', 466.16),
    ('J', 493.88),
    ('K', 523.25),
];

pub const NOTE_KEY_COUNT: usize = NOTE_KEYS.len();

/// Frequency a note key plays at the given octave shift
pub fn key_frequency(index: usize, octave_shift: i8) -> f32 {
    NOTE_KEYS[index].1 * 2.0f32.powi(octave_shift as i32)
}

/// Which keys are physically down at one poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeySnapshot {
    pub notes: [bool; NOTE_KEY_COUNT],
    pub volume_up: bool,
    pub volume_down: bool,
    pub select_sine: bool,
    pub select_square: bool,
    pub select_saw: bool,
    pub octave_up: bool,
    pub octave_down: bool,
    pub record: bool,
    pub quit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerAction {
    Note(NoteEvent),
    StateChanged(SynthState),
    ToggleRecording,
    Quit,
}

pub struct KeyboardController {
    previous: KeySnapshot,
    /// Frequency each held note key is sounding at
    held: [Option<f32>; NOTE_KEY_COUNT],
    state: SynthState,
}

impl KeyboardController {
    pub fn new(state: SynthState) -> Self {
        Self {
            previous: KeySnapshot::default(),
            held: [None; NOTE_KEY_COUNT],
            state,
        }
    }

    pub fn state(&self) -> SynthState {
        self.state
    }

    pub fn is_held(&self, index: usize) -> bool {
        self.held.get(index).is_some_and(Option::is_some)
    }

    /// Diff `current` against the previous poll and emit the resulting
    /// actions, note events first, in key order.
    pub fn update(&mut self, current: &KeySnapshot) -> Vec<ControllerAction> {
        let mut actions = Vec::new();
        let before = self.state;

        for index in 0..NOTE_KEY_COUNT {
            let down = current.notes[index];
            match (self.held[index], down) {
                (None, true) => {
                    let frequency = key_frequency(index, self.state.octave_shift);
                    self.held[index] = Some(frequency);
                    actions.push(ControllerAction::Note(NoteEvent::NoteOn { frequency }));
                }
                (Some(frequency), false) => {
                    self.held[index] = None;
                    actions.push(ControllerAction::Note(NoteEvent::NoteOff { frequency }));
                }
                _ => {}
            }
        }

        // Volume ramps while held
        if current.volume_up {
            self.state = self.state.nudge_volume(VOLUME_STEP);
        }
        if current.volume_down {
            self.state = self.state.nudge_volume(-VOLUME_STEP);
        }

        if current.select_sine {
            self.state = self.state.with_waveform(WaveformType::Sine);
        }
        if current.select_square {
            self.state = self.state.with_waveform(WaveformType::Square);
        }
        if current.select_saw {
            self.state = self.state.with_waveform(WaveformType::Saw);
        }

        // Octave on rising edge only
        if current.octave_up && !self.previous.octave_up {
            self.state = self.state.shift_octave(1);
            tracing::info!("Octave: {:+}", self.state.octave_shift);
        }
        if current.octave_down && !self.previous.octave_down {
            self.state = self.state.shift_octave(-1);
            tracing::info!("Octave: {:+}", self.state.octave_shift);
        }

        if self.state != before {
            actions.push(ControllerAction::StateChanged(self.state));
        }

        if current.record && !self.previous.record {
            actions.push(ControllerAction::ToggleRecording);
        }
        if current.quit {
            actions.push(ControllerAction::Quit);
        }

        self.previous = *current;
        actions
    }

    /// Direct control from the UI widgets
    pub fn set_waveform(&mut self, waveform: WaveformType) -> Option<ControllerAction> {
        self.apply(self.state.with_waveform(waveform))
    }

    pub fn set_volume(&mut self, volume: f32) -> Option<ControllerAction> {
        self.apply(self.state.with_volume(volume))
    }

    fn apply(&mut self, state: SynthState) -> Option<ControllerAction> {
        if state == self.state {
            return None;
        }
        self.state = state;
        Some(ControllerAction::StateChanged(state))
    }

    /// Note-offs for every held key, e.g. when the window loses focus
    pub fn release_all(&mut self) -> Vec<NoteEvent> {
        self.held
            .iter_mut()
            .filter_map(Option::take)
            .map(|frequency| NoteEvent::NoteOff { frequency })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_note(index: usize) -> KeySnapshot {
        let mut snapshot = KeySnapshot::default();
        snapshot.notes[index] = true;
        snapshot
    }

    fn note_events(actions: &[ControllerAction]) -> Vec<NoteEvent> {
        actions
            .iter()
            .filter_map(|a| match a {
                ControllerAction::Note(event) => Some(*event),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_press_and_release() {
        let mut controller = KeyboardController::new(SynthState::default());

        let actions = controller.update(&with_note(0));
        assert_eq!(note_events(&actions), vec![NoteEvent::NoteOn { frequency: 261.63 }]);
        assert!(controller.is_held(0));

        // Touche maintenue : aucun nouvel événement
        assert!(controller.update(&with_note(0)).is_empty());

        let actions = controller.update(&KeySnapshot::default());
        assert_eq!(note_events(&actions), vec![NoteEvent::NoteOff { frequency: 261.63 }]);
        assert!(!controller.is_held(0));
    }

    #[test]
    fn test_octave_shift_applies_to_new_notes() {
        let mut controller = KeyboardController::new(SynthState::default());
        let up = KeySnapshot {
            octave_up: true,
            ..KeySnapshot::default()
        };
        controller.update(&up);
        controller.update(&KeySnapshot::default());
        assert_eq!(controller.state().octave_shift, 1);

        let actions = controller.update(&with_note(9));
        assert_eq!(note_events(&actions), vec![NoteEvent::NoteOn { frequency: 880.0 }]);
    }

    #[test]
    fn test_octave_change_while_held_releases_initial_frequency() {
        let mut controller = KeyboardController::new(SynthState::default());
        controller.update(&with_note(9));

        let mut down = with_note(9);
        down.octave_down = true;
        controller.update(&down);
        assert_eq!(controller.state().octave_shift, -1);

        let actions = controller.update(&KeySnapshot::default());
        assert_eq!(note_events(&actions), vec![NoteEvent::NoteOff { frequency: 440.0 }]);
    }

    #[test]
    fn test_octave_rising_edge_only() {
        let mut controller = KeyboardController::new(SynthState::default());
        let up = KeySnapshot {
            octave_up: true,
            ..KeySnapshot::default()
        };
        for _ in 0..10 {
            controller.update(&up);
        }
        assert_eq!(controller.state().octave_shift, 1);

        // Relâcher puis ré-appuyer, au-delà de la limite
        for _ in 0..5 {
            controller.update(&KeySnapshot::default());
            controller.update(&up);
        }
        assert_eq!(controller.state().octave_shift, 3);
    }

    #[test]
    fn test_volume_ramps_while_held() {
        let mut controller = KeyboardController::new(SynthState::default());
        let up = KeySnapshot {
            volume_up: true,
            ..KeySnapshot::default()
        };
        for _ in 0..10 {
            controller.update(&up);
        }
        assert!((controller.state().master_volume - 0.6).abs() < 1e-4);

        for _ in 0..100 {
            controller.update(&up);
        }
        assert_eq!(controller.state().master_volume, 1.0);

        let down = KeySnapshot {
            volume_down: true,
            ..KeySnapshot::default()
        };
        for _ in 0..200 {
            controller.update(&down);
        }
        assert_eq!(controller.state().master_volume, 0.0);
    }

    #[test]
    fn test_waveform_select_publishes_once() {
        let mut controller = KeyboardController::new(SynthState::default());
        let saw = KeySnapshot {
            select_saw: true,
            ..KeySnapshot::default()
        };
        let actions = controller.update(&saw);
        assert!(matches!(
            actions.as_slice(),
            [ControllerAction::StateChanged(state)] if state.waveform == WaveformType::Saw
        ));
        // Déjà sélectionné : pas de nouvelle publication
        assert!(controller.update(&saw).is_empty());
    }

    #[test]
    fn test_record_toggle_on_rising_edge() {
        let mut controller = KeyboardController::new(SynthState::default());
        let record = KeySnapshot {
            record: true,
            ..KeySnapshot::default()
        };
        assert_eq!(controller.update(&record), vec![ControllerAction::ToggleRecording]);
        assert!(controller.update(&record).is_empty());
        controller.update(&KeySnapshot::default());
        assert_eq!(controller.update(&record), vec![ControllerAction::ToggleRecording]);
    }

    #[test]
    fn test_quit() {
        let mut controller = KeyboardController::new(SynthState::default());
        let quit = KeySnapshot {
            quit: true,
            ..KeySnapshot::default()
        };
        assert_eq!(controller.update(&quit), vec![ControllerAction::Quit]);
    }

    #[test]
    fn test_release_all() {
        let mut controller = KeyboardController::new(SynthState::default());
        let mut chord = KeySnapshot::default();
        chord.notes[0] = true;
        chord.notes[4] = true;
        chord.notes[7] = true;
        controller.update(&chord);

        let released = controller.release_all();
        assert_eq!(released.len(), 3);
        assert!((0..NOTE_KEY_COUNT).all(|i| !controller.is_held(i)));
    }

    #[test]
    fn test_key_frequency() {
        assert_eq!(key_frequency(9, 0), 440.0);
        assert_eq!(key_frequency(9, 1), 880.0);
        assert_eq!(key_frequency(9, -3), 55.0);
    }

    #[test]
    fn test_widget_controls() {
        let mut controller = KeyboardController::new(SynthState::default());
        assert!(controller.set_waveform(WaveformType::Sine).is_none());
        assert!(controller.set_waveform(WaveformType::Square).is_some());
        assert!(controller.set_volume(0.8).is_some());
        assert_eq!(controller.state().master_volume, 0.8);
    }
}
