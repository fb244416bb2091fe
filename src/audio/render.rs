// Render engine - Le tick audio temps-réel, indépendant du périphérique
//
// ========== SACRED ZONE ==========
// Everything reachable from `render` runs inside the device callback:
// no allocations, no I/O, no locks, no panics. Internal inconsistencies
// are sanitized to silence instead of being reported.

use cpal::{FromSample, Sample};

use crate::audio::dsp_utils::sanitize_sample;
use crate::audio::format_conversion::write_mono_to_interleaved_frame;
use crate::audio::parameters::{SharedSynthState, SynthState};
use crate::audio::recorder::{Recorder, RecordingHandoff};
use crate::messaging::channels::{CommandReceiver, HandoffSender};
use crate::messaging::command::{Command, NoteEvent};
use crate::synth::note_table::NoteTable;

pub struct RenderEngine {
    notes: NoteTable,
    recorder: Recorder,
    commands: CommandReceiver,
    state: SharedSynthState,
    handoff_tx: HandoffSender,
    sample_rate: u32,
    dt: f64,
}

impl RenderEngine {
    pub fn new(
        sample_rate: u32,
        commands: CommandReceiver,
        state: SharedSynthState,
        handoff_tx: HandoffSender,
    ) -> Self {
        Self {
            notes: NoteTable::new(),
            recorder: Recorder::new(),
            commands,
            state,
            handoff_tx,
            sample_rate,
            dt: 1.0 / sample_rate.max(1) as f64,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn notes(&self) -> &NoteTable {
        &self.notes
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Fill one interleaved output buffer (one render tick).
    ///
    /// SynthState is snapshotted once for the whole tick; pending commands
    /// are drained before every frame.
    pub fn render<T>(&mut self, data: &mut [T], channels: usize)
    where
        T: Sample + FromSample<f32>,
    {
        // Hand-offs parked on an earlier tick
        self.handoff_tx.flush();

        let state = self.state.snapshot();
        for frame in data.chunks_mut(channels.max(1)) {
            let sample = self.next_sample(&state);
            write_mono_to_interleaved_frame(sample, frame);
        }
    }

    /// Produce one mono frame with the given parameter snapshot
    #[inline]
    pub fn next_sample(&mut self, state: &SynthState) -> f32 {
        self.process_commands();

        let (sum, active) = self.notes.advance_and_mix(self.dt, state.waveform);
        let mixed = if active > 0 { sum / active as f32 } else { 0.0 };
        let sample = sanitize_sample(mixed * state.master_volume);

        self.recorder.append(sample);
        sample
    }

    /// Apply every pending command in arrival order
    pub fn process_commands(&mut self) {
        while let Some(command) = self.commands.pop() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Note(NoteEvent::NoteOn { frequency }) => {
                // Dropped silently when polyphony is exhausted
                self.notes.allocate(frequency);
            }
            Command::Note(NoteEvent::NoteOff { frequency }) => {
                self.notes.release(frequency);
            }
            Command::AllNotesOff => self.notes.release_all(),
            Command::StartRecording(session) => {
                if let Err(session) = self.recorder.begin(session) {
                    self.handoff_tx.send(RecordingHandoff::Rejected(session));
                }
            }
            Command::StopRecording => {
                if let Some(recording) = self.recorder.stop() {
                    self.handoff_tx.send(RecordingHandoff::Finished(recording));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::recorder::RecordingSession;
    use crate::messaging::channels::{
        CommandSender, EventQueueBuilder, HandoffReceiver, PARKED_HANDOFFS, create_handoff_channel,
    };
    use crate::synth::oscillator::WaveformType;

    const SAMPLE_RATE: u32 = 44100;

    fn engine_with(
        state: SynthState,
        handoff_capacity: usize,
    ) -> (RenderEngine, CommandSender, HandoffReceiver) {
        let mut builder = EventQueueBuilder::new(64);
        let tx = builder.producer();
        let (handoff_tx, handoff_rx) = create_handoff_channel(handoff_capacity);
        let engine = RenderEngine::new(
            SAMPLE_RATE,
            builder.build(),
            SharedSynthState::new(state),
            handoff_tx,
        );
        (engine, tx, handoff_rx)
    }

    #[test]
    fn test_silence_without_notes() {
        let (mut engine, _tx, _rx) = engine_with(SynthState::default(), 2);
        let mut buffer = [1.0f32; 512];
        engine.render(&mut buffer, 2);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_stereo_duplication() {
        let (mut engine, mut tx, _rx) = engine_with(SynthState::default(), 2);
        tx.send(NoteEvent::NoteOn { frequency: 440.0 }).unwrap();

        let mut buffer = [0.0f32; 256];
        engine.render(&mut buffer, 2);
        for frame in buffer.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(buffer.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_normalization_by_active_count() {
        let state = SynthState {
            master_volume: 1.0,
            waveform: WaveformType::Square,
            octave_shift: 0,
        };
        let (mut engine, mut tx, _rx) = engine_with(state, 2);
        for f in [110.0, 220.0, 330.0, 440.0] {
            tx.send(NoteEvent::NoteOn { frequency: f }).unwrap();
        }

        // Square à t=0 : toutes les notes à +1, moyenne = 1
        assert_eq!(engine.next_sample(&state), 1.0);
        assert_eq!(engine.notes().active_count(), 4);
    }

    #[test]
    fn test_master_volume_applied() {
        let state = SynthState {
            master_volume: 0.25,
            waveform: WaveformType::Square,
            octave_shift: 0,
        };
        let (mut engine, mut tx, _rx) = engine_with(state, 2);
        tx.send(NoteEvent::NoteOn { frequency: 100.0 }).unwrap();
        assert_eq!(engine.next_sample(&state), 0.25);
    }

    #[test]
    fn test_note_off_silences() {
        let (mut engine, mut tx, _rx) = engine_with(SynthState::default(), 2);
        tx.send(NoteEvent::NoteOn { frequency: 440.0 }).unwrap();
        let mut buffer = [0.0f32; 128];
        engine.render(&mut buffer, 2);

        tx.send(NoteEvent::NoteOff { frequency: 440.0 }).unwrap();
        engine.render(&mut buffer, 2);
        assert_eq!(engine.notes().active_count(), 0);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_all_notes_off() {
        let (mut engine, mut tx, _rx) = engine_with(SynthState::default(), 2);
        for f in [220.0, 330.0] {
            tx.send(NoteEvent::NoteOn { frequency: f }).unwrap();
        }
        tx.send(Command::AllNotesOff).unwrap();
        engine.process_commands();
        assert_eq!(engine.notes().active_count(), 0);
    }

    #[test]
    fn test_stop_hands_recording_back() {
        let (mut engine, mut tx, mut rx) = engine_with(SynthState::default(), 2);
        tx.send(Command::StartRecording(
            RecordingSession::with_capacity(1000, SAMPLE_RATE).unwrap(),
        ))
        .unwrap();
        tx.send(NoteEvent::NoteOn { frequency: 261.63 }).unwrap();

        let mut buffer = [0.0f32; 200];
        engine.render(&mut buffer, 2);
        assert!(engine.is_recording());
        let left_channel: Vec<f32> = buffer.iter().step_by(2).copied().collect();

        tx.send(Command::StopRecording).unwrap();
        engine.render(&mut buffer[..2], 2);
        assert!(!engine.is_recording());

        match rx.try_recv() {
            Some(RecordingHandoff::Finished(recording)) => {
                // 100 frames du premier tick ; le stop est appliqué avant la 1ère frame du second
                assert_eq!(recording.len(), 100);
                assert_eq!(recording.samples(), &left_channel[..]);
            }
            other => panic!("Expected finished recording, got {:?}", other),
        }
    }

    #[test]
    fn test_second_start_is_rejected() {
        let (mut engine, mut tx, mut rx) = engine_with(SynthState::default(), 2);
        for capacity in [10, 20] {
            tx.send(Command::StartRecording(
                RecordingSession::with_capacity(capacity, SAMPLE_RATE).unwrap(),
            ))
            .unwrap();
        }
        engine.process_commands();

        match rx.try_recv() {
            Some(RecordingHandoff::Rejected(session)) => assert_eq!(session.max_samples(), 20),
            other => panic!("Expected rejected session, got {:?}", other),
        }
        assert!(engine.is_recording());
    }

    #[test]
    fn test_handoff_parked_when_channel_full() {
        let (mut engine, mut tx, mut rx) = engine_with(SynthState::default(), 1);

        for _ in 0..2 {
            tx.send(Command::StartRecording(
                RecordingSession::with_capacity(8, SAMPLE_RATE).unwrap(),
            ))
            .unwrap();
            tx.send(Command::StopRecording).unwrap();
        }
        engine.process_commands();

        // Le premier passe, le second attend dans le slot de parking
        assert!(matches!(rx.try_recv(), Some(RecordingHandoff::Finished(_))));
        assert!(rx.try_recv().is_none());

        let mut buffer = [0.0f32; 4];
        engine.render(&mut buffer, 2);
        assert!(matches!(rx.try_recv(), Some(RecordingHandoff::Finished(_))));
        assert_eq!(rx.lost_count(), 0);
    }

    #[test]
    fn test_handoff_loss_counted_when_parking_full() {
        let (mut engine, mut tx, mut rx) = engine_with(SynthState::default(), 1);

        // Un dans le canal, PARKED_HANDOFFS en attente, le dernier perdu
        for _ in 0..(PARKED_HANDOFFS + 2) {
            tx.send(Command::StartRecording(
                RecordingSession::with_capacity(8, SAMPLE_RATE).unwrap(),
            ))
            .unwrap();
            tx.send(Command::StopRecording).unwrap();
        }
        engine.process_commands();
        assert_eq!(rx.lost_count(), 1);

        let mut buffer = [0.0f32; 4];
        let mut delivered = 0;
        for _ in 0..(PARKED_HANDOFFS + 2) {
            while rx.try_recv().is_some() {
                delivered += 1;
            }
            engine.render(&mut buffer, 2);
        }
        assert_eq!(delivered, PARKED_HANDOFFS + 1);
    }

    #[test]
    fn test_state_snapshot_read_per_tick() {
        let shared = SharedSynthState::new(SynthState {
            master_volume: 1.0,
            waveform: WaveformType::Square,
            octave_shift: 0,
        });
        let mut builder = EventQueueBuilder::new(8);
        let mut tx = builder.producer();
        let (handoff_tx, _handoff_rx) = create_handoff_channel(1);
        let mut engine = RenderEngine::new(SAMPLE_RATE, builder.build(), shared.clone(), handoff_tx);
        tx.send(NoteEvent::NoteOn { frequency: 1.0 }).unwrap();

        let mut buffer = [0.0f32; 8];
        engine.render(&mut buffer, 2);
        assert!(buffer.iter().all(|&s| s == 1.0));

        shared.publish(SynthState {
            master_volume: 0.5,
            waveform: WaveformType::Square,
            octave_shift: 0,
        });
        engine.render(&mut buffer, 2);
        assert!(buffer.iter().all(|&s| s == 0.5));
    }
}
