use std::path::Path;

use anyhow::{Context, Result};
use keysynth::config::CONFIG_FILE;
use keysynth::messaging::notification::{Notification, NotificationCategory};
use keysynth::midi::input::MidiInput;
use keysynth::ui::app::{SynthApp, SynthAppChannels};
use keysynth::{
    AudioEngine, EventQueueBuilder, RenderEngine, SharedSynthState, SynthConfig, SynthState,
    create_handoff_channel, create_notification_channel,
};

// A handful of recordings at most are ever in flight
const HANDOFF_RINGBUFFER_CAPACITY: usize = 4;
const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 256;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = SynthConfig::load_or_default(Path::new(CONFIG_FILE))
        .with_context(|| format!("Failed to load {}", CONFIG_FILE))?;
    tracing::debug!("Configuration: {:?}", config);

    let shared_state = SharedSynthState::new(SynthState::default().with_volume(config.initial_volume));

    // One queue, one sender per producer
    let mut queue = EventQueueBuilder::new(config.event_queue_capacity);
    let command_tx_ui = queue.producer();
    let command_tx_midi = queue.producer();
    let command_rx = queue.build();

    let (handoff_tx, handoff_rx) = create_handoff_channel(HANDOFF_RINGBUFFER_CAPACITY);
    let (notifications, notification_rx) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);

    let render = RenderEngine::new(
        config.sample_rate,
        command_rx,
        shared_state.clone(),
        handoff_tx,
    );
    let audio_engine = AudioEngine::start(&config, render, notifications.clone())
        .context("Audio engine initialisation failed")?;

    let midi_input = if config.midi_enabled {
        match MidiInput::connect(command_tx_midi, notifications.clone()) {
            Ok(input) => Some(input),
            Err(e) => {
                tracing::warn!("MIDI unavailable: {}", e);
                notifications.notify(Notification::warning(
                    NotificationCategory::Midi,
                    format!("MIDI unavailable: {}", e),
                ));
                None
            }
        }
    } else {
        tracing::info!("MIDI disabled in configuration");
        None
    };
    let midi_port = midi_input
        .as_ref()
        .and_then(|input| input.port_name())
        .map(str::to_string);

    tracing::info!(
        "keysynth started: {} Hz, {} channels",
        audio_engine.sample_rate(),
        audio_engine.channels()
    );

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([640.0, 360.0])
            .with_title("keysynth"),
        ..Default::default()
    };

    let channels = SynthAppChannels {
        command_tx: command_tx_ui,
        handoff_rx,
        notification_rx,
    };

    eframe::run_native(
        "keysynth",
        native_options,
        Box::new(move |_cc| Ok(Box::new(SynthApp::new(&config, shared_state, channels, midi_port)))),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {}", e))?;

    // Stream and MIDI connection close here, after the UI has flushed
    drop(midi_input);
    drop(audio_engine);
    tracing::info!("Bye");
    Ok(())
}
