// Recorder - Capture of the rendered mono signal
//
// A RecordingSession is allocated off the audio thread with its full
// capacity reserved up-front, moved into the render engine to be filled,
// and moved back out when recording stops. The audio thread never grows
// or frees the buffer.

use std::collections::TryReserveError;

#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Invalid recording duration: {0}s")]
    InvalidDuration(f32),

    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    #[error("Could not allocate a recording buffer of {samples} samples")]
    AllocationFailed {
        samples: usize,
        #[source]
        source: TryReserveError,
    },
}

/// A bounded capture buffer being filled by the render engine
#[derive(Debug)]
pub struct RecordingSession {
    samples: Vec<f32>,
    max_samples: usize,
    sample_rate: u32,
}

impl RecordingSession {
    /// Start of a recording: reserve room for `max_duration_seconds ×
    /// sample_rate` samples. Called on the UI thread, the session is then
    /// moved to the render engine with `Command::StartRecording`.
    pub fn new(max_duration_seconds: f32, sample_rate: u32) -> Result<Self, RecorderError> {
        if !max_duration_seconds.is_finite() || max_duration_seconds <= 0.0 {
            return Err(RecorderError::InvalidDuration(max_duration_seconds));
        }
        if sample_rate == 0 {
            return Err(RecorderError::InvalidSampleRate(sample_rate));
        }

        let max_samples = (max_duration_seconds as f64 * sample_rate as f64) as usize;
        Self::with_capacity(max_samples, sample_rate)
    }

    /// Reserve room for exactly `max_samples` samples
    pub fn with_capacity(max_samples: usize, sample_rate: u32) -> Result<Self, RecorderError> {
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(max_samples)
            .map_err(|source| RecorderError::AllocationFailed {
                samples: max_samples,
                source,
            })?;

        Ok(Self {
            samples,
            max_samples,
            sample_rate,
        })
    }

    /// Append one sample; returns `false` once the cap is reached
    #[inline]
    pub fn append(&mut self, sample: f32) -> bool {
        if self.is_full() {
            return false;
        }
        self.samples.push(sample);
        true
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.max_samples
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn finish(self) -> Recording {
        Recording {
            samples: self.samples,
            sample_rate: self.sample_rate,
        }
    }
}

/// A finished capture, ready for export
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Recording {
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Buffers leaving the audio thread
#[derive(Debug)]
pub enum RecordingHandoff {
    /// Recording stopped; the capture is ready for export
    Finished(Recording),
    /// A start request arrived while already recording; returned unused
    Rejected(RecordingSession),
}

/// Idle / Recording state machine owned by the render engine
#[derive(Debug, Default)]
pub struct Recorder {
    session: Option<RecordingSession>,
}

impl Recorder {
    pub fn new() -> Self {
        Self { session: None }
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Begin recording into a pre-allocated session. While already
    /// recording the session is handed back untouched.
    pub fn begin(&mut self, session: RecordingSession) -> Result<(), RecordingSession> {
        if self.is_recording() {
            return Err(session);
        }
        self.session = Some(session);
        Ok(())
    }

    #[inline]
    pub fn append(&mut self, sample: f32) {
        if let Some(session) = self.session.as_mut() {
            session.append(sample);
        }
    }

    /// End the session and give up ownership of the captured samples
    pub fn stop(&mut self) -> Option<Recording> {
        self.session.take().map(RecordingSession::finish)
    }
}
