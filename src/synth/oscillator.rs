// Oscillateur - Générateur de formes d'onde sans état
//
// Every waveform is derived from the number of elapsed cycles
// `frequency * time`, evaluated in f64 so that long-held notes keep their
// pitch. The saw is naive (no band limiting) and aliases at high pitches.

use std::f64::consts::TAU;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WaveformType {
    #[default]
    Sine,
    Square,
    Saw,
}

impl WaveformType {
    pub const ALL: [WaveformType; 3] = [WaveformType::Sine, WaveformType::Square, WaveformType::Saw];

    pub fn name(self) -> &'static str {
        match self {
            WaveformType::Sine => "Sine",
            WaveformType::Square => "Square",
            WaveformType::Saw => "Saw",
        }
    }

    /// Compact encoding used by the lock-free parameter snapshot
    pub(crate) fn to_bits(self) -> u8 {
        match self {
            WaveformType::Sine => 0,
            WaveformType::Square => 1,
            WaveformType::Saw => 2,
        }
    }

    pub(crate) fn from_bits(bits: u8) -> Self {
        match bits {
            1 => WaveformType::Square,
            2 => WaveformType::Saw,
            _ => WaveformType::Sine,
        }
    }
}

/// Amplitude of `waveform` at `time` seconds after note-on.
///
/// - Sine: `sin(2π·f·t)`
/// - Square: sign of the sine term, zero counts as positive
/// - Saw: `2·(f·t − floor(f·t + 0.5))`, bipolar with period `1/f`
///
/// The result is always within [-1, 1] for finite inputs.
#[inline]
pub fn generate_sample(frequency: f32, time: f64, waveform: WaveformType) -> f32 {
    let cycles = frequency as f64 * time;

    match waveform {
        WaveformType::Sine => (TAU * cycles).sin() as f32,
        WaveformType::Square => {
            if (TAU * cycles).sin() >= 0.0 {
                1.0
            } else {
                -1.0
            }
        }
        WaveformType::Saw => (2.0 * (cycles - (cycles + 0.5).floor())) as f32,
    }
}
