// Synth parameters - Lock-free snapshot UI → Audio thread
//
// The whole SynthState is packed into a single AtomicU64 so that the audio
// thread always reads a coherent snapshot: volume, waveform and octave are
// published together by one store and read together by one load.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::synth::oscillator::WaveformType;

pub const MIN_OCTAVE_SHIFT: i8 = -3;
pub const MAX_OCTAVE_SHIFT: i8 = 3;

/// User-facing synthesizer controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthState {
    /// Master volume in [0, 1]
    pub master_volume: f32,
    pub waveform: WaveformType,
    /// Octave shift in [-3, 3]
    pub octave_shift: i8,
}

impl Default for SynthState {
    fn default() -> Self {
        Self {
            master_volume: 0.5,
            waveform: WaveformType::Sine,
            octave_shift: 0,
        }
    }
}

impl SynthState {
    /// Non-finite volumes leave the state unchanged
    pub fn with_volume(self, volume: f32) -> Self {
        if !volume.is_finite() {
            return self;
        }
        Self {
            master_volume: volume.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn nudge_volume(self, delta: f32) -> Self {
        self.with_volume(self.master_volume + delta)
    }

    pub fn with_waveform(self, waveform: WaveformType) -> Self {
        Self { waveform, ..self }
    }

    pub fn shift_octave(self, delta: i8) -> Self {
        Self {
            octave_shift: self
                .octave_shift
                .saturating_add(delta)
                .clamp(MIN_OCTAVE_SHIFT, MAX_OCTAVE_SHIFT),
            ..self
        }
    }

    fn pack(self) -> u64 {
        let volume = self.master_volume.to_bits() as u64;
        let waveform = (self.waveform.to_bits() as u64) << 32;
        let octave = ((self.octave_shift as u8) as u64) << 40;
        volume | waveform | octave
    }

    fn unpack(bits: u64) -> Self {
        let volume = f32::from_bits(bits as u32);
        Self {
            // Packed values are always published clamped; sanitize anyway
            master_volume: if volume.is_finite() {
                volume.clamp(0.0, 1.0)
            } else {
                0.0
            },
            waveform: WaveformType::from_bits((bits >> 32) as u8),
            octave_shift: ((bits >> 40) as u8 as i8).clamp(MIN_OCTAVE_SHIFT, MAX_OCTAVE_SHIFT),
        }
    }
}

/// Shared handle to the current SynthState
#[derive(Clone)]
pub struct SharedSynthState {
    inner: Arc<AtomicU64>,
}

impl SharedSynthState {
    pub fn new(state: SynthState) -> Self {
        Self {
            inner: Arc::new(AtomicU64::new(state.pack())),
        }
    }

    /// Publish a new snapshot (called from the UI thread)
    pub fn publish(&self, state: SynthState) {
        self.inner.store(state.pack(), Ordering::Release);
    }

    /// Read the current snapshot (called once per render tick)
    pub fn snapshot(&self) -> SynthState {
        SynthState::unpack(self.inner.load(Ordering::Acquire))
    }
}

impl Default for SharedSynthState {
    fn default() -> Self {
        Self::new(SynthState::default())
    }
}
