// Module MIDI - Parsing et entrée midir

pub mod event;
pub mod input;
