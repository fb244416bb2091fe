// Module synthèse - Formes d'onde et table de notes

pub mod note_table;
pub mod oscillator;
