// Module audio - Backend CPAL, tick de rendu et enregistrement

pub mod dsp_utils;
pub mod engine;
pub mod export;
pub mod format_conversion;
pub mod parameters;
pub mod recorder;
pub mod render;
