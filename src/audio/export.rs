// Audio Export - Finished recordings to WAV files
//
// Recordings are written as mono 16-bit signed PCM at the engine sample
// rate. Files are named `recording<N>.wav`, using the first N (from 1)
// that does not exist yet in the output directory.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::audio::recorder::Recording;

/// Highest index probed for `recording<N>.wav`
pub const MAX_RECORDING_INDEX: u32 = 9999;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("WAV write failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("No free recording file name left in {}", .0.display())]
    NoFreeFileName(PathBuf),
}

/// Convert an amplitude in [-1, 1] to a 16-bit PCM sample.
///
/// `round(a × 32767)` clamped to the i16 range; non-finite input is silence.
#[inline]
pub fn amplitude_to_pcm16(amplitude: f32) -> i16 {
    if !amplitude.is_finite() {
        return 0;
    }
    (amplitude * i16::MAX as f32)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Write `samples` as a mono 16-bit PCM WAV file
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), ExportError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(amplitude_to_pcm16(sample))?;
    }
    writer.finalize()?;

    Ok(())
}

/// Writes finished recordings into a directory
#[derive(Debug, Clone)]
pub struct RecordingExporter {
    output_dir: PathBuf,
}

impl RecordingExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// First `recording<N>.wav` that does not exist yet
    pub fn next_path(&self) -> Result<PathBuf, ExportError> {
        (1..=MAX_RECORDING_INDEX)
            .map(|n| self.output_dir.join(format!("recording{}.wav", n)))
            .find(|path| !path.exists())
            .ok_or_else(|| ExportError::NoFreeFileName(self.output_dir.clone()))
    }

    /// Export to the next free file name and return its path
    pub fn export(&self, recording: &Recording) -> Result<PathBuf, ExportError> {
        let path = self.next_path()?;
        write_wav(&path, recording.samples(), recording.sample_rate())?;

        tracing::info!(
            "Saved recording to {} ({} samples, {:.2}s)",
            path.display(),
            recording.len(),
            recording.duration_seconds()
        );
        Ok(path)
    }
}
