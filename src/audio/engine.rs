// Moteur audio - Callback CPAL temps-réel
//
// # Format Support
//
// The device's preferred sample format is detected via `sample_format()`
// and a stream of the matching type is built (F32, I16 or U16). All
// rendering happens in f32; conversion happens when the output buffer is
// written, without allocation.
//
// # Ownership
//
// The RenderEngine is moved into the data callback and owned by the audio
// thread alone. Producers reach it only through the event queue and the
// SynthState snapshot, so the callback never takes a lock.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig};

use crate::audio::render::RenderEngine;
use crate::config::SynthConfig;
use crate::messaging::channels::NotificationSender;
use crate::messaging::notification::{Notification, NotificationCategory};

/// Output is always stereo; the mono mix is duplicated to both channels
pub const OUTPUT_CHANNELS: u16 = 2;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Audio configuration error: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Error in stream creation: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Error in stream start: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Unsupported sample format: {0:?}. Supported formats: F32, I16, U16")]
    UnsupportedFormat(SampleFormat),
}

pub struct AudioEngine {
    _device: Device,
    _stream: Stream,
    sample_rate: u32,
    channels: u16,
}

impl AudioEngine {
    /// Open the default output device and start rendering
    pub fn start(
        config: &SynthConfig,
        render: RenderEngine,
        notifications: NotificationSender,
    ) -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(EngineError::NoDevice)?;

        tracing::info!(
            "Audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let sample_format = device.default_output_config()?.sample_format();
        let sample_rate = render.sample_rate();

        let stream_config = StreamConfig {
            channels: OUTPUT_CHANNELS,
            sample_rate: SampleRate(sample_rate),
            buffer_size: match config.buffer_frames {
                Some(frames) => cpal::BufferSize::Fixed(frames),
                None => cpal::BufferSize::Default,
            },
        };
        tracing::debug!("Stream config: {:?}, format {:?}", stream_config, sample_format);

        let stream = match sample_format {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &stream_config, render, notifications.clone())
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &stream_config, render, notifications.clone())
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &stream_config, render, notifications.clone())
            }
            other => return Err(EngineError::UnsupportedFormat(other)),
        }?;

        stream.play()?;

        tracing::info!(
            "Audio engine started: {} Hz, {} channels",
            sample_rate,
            OUTPUT_CHANNELS
        );

        notifications.notify(Notification::info(
            NotificationCategory::Audio,
            format!("Audio connected: {} Hz", sample_rate),
        ));

        Ok(Self {
            _device: device,
            _stream: stream,
            sample_rate,
            channels: OUTPUT_CHANNELS,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        mut render: RenderEngine,
        notifications: NotificationSender,
    ) -> Result<Stream, EngineError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let channels = config.channels as usize;

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // ========== SACRED ZONE ==========
                render.render(data, channels);
            },
            move |err| {
                // Runs outside the data callback, so I/O is fine here
                tracing::error!("Audio stream error: {}", err);

                notifications.notify(Notification::error(
                    NotificationCategory::Audio,
                    format!("Audio stream error: {}", err),
                ));
            },
            None,
        )?;

        Ok(stream)
    }
}
