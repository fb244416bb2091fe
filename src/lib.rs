// keysynth - Library exports for tests and benchmarks

pub mod audio;
pub mod config;
pub mod messaging;
pub mod midi;
pub mod synth;
pub mod ui;

// Re-export commonly used types for convenience
pub use audio::engine::AudioEngine;
pub use audio::export::RecordingExporter;
pub use audio::parameters::{SharedSynthState, SynthState};
pub use audio::recorder::{Recorder, Recording, RecordingHandoff, RecordingSession};
pub use audio::render::RenderEngine;
pub use config::SynthConfig;
pub use messaging::channels::{
    CommandSender, EventQueueBuilder, create_handoff_channel, create_notification_channel,
};
pub use messaging::command::{Command, NoteEvent};
pub use midi::event::MidiEvent;
pub use synth::note_table::NoteTable;
pub use synth::oscillator::{WaveformType, generate_sample};
