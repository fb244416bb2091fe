// MIDI Input - Réception des événements MIDI
//
// The midir callback runs on the driver's thread and talks to the render
// engine only through its own sender on the event queue. Problems reach
// the status bar through the notification channel.

use crate::messaging::channels::{CommandSender, NotificationSender};
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::midi::event::MidiEvent;
use midir::{MidiInput as MidirInput, MidiInputConnection};

const CLIENT_NAME: &str = "keysynth MIDI Input";
const PORT_NAME: &str = "keysynth-input";

#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("MIDI init error: {0}")]
    Init(#[from] midir::InitError),

    #[error("MIDI connection failed: {0}")]
    Connect(String),
}

/// Turns raw MIDI messages into commands on the MIDI sender
pub struct MidiForwarder {
    command_tx: CommandSender,
    notifications: NotificationSender,
    overflowing: bool,
}

impl MidiForwarder {
    pub fn new(command_tx: CommandSender, notifications: NotificationSender) -> Self {
        Self {
            command_tx,
            notifications,
            overflowing: false,
        }
    }

    pub fn handle(&mut self, message: &[u8]) {
        let Some(command) = MidiEvent::from_bytes(message).and_then(MidiEvent::to_command) else {
            return;
        };

        match self.command_tx.send(command) {
            Ok(()) => self.overflowing = false,
            Err(_) => {
                tracing::warn!("MIDI queue full, event dropped");
                // Une notification par rafale, pas par événement
                if !self.overflowing {
                    self.overflowing = true;
                    self.notifications.notify(Notification::warning(
                        NotificationCategory::Midi,
                        "MIDI events dropped: event queue full",
                    ));
                }
            }
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.command_tx.dropped_count()
    }
}

pub struct MidiInput {
    _connection: Option<MidiInputConnection<()>>,
    port_name: Option<String>,
}

impl MidiInput {
    /// Connect to the first available input port. Having no port is not
    /// an error: the synth keeps running keyboard-only.
    pub fn connect(
        command_tx: CommandSender,
        notifications: NotificationSender,
    ) -> Result<Self, MidiError> {
        let midi_in = MidirInput::new(CLIENT_NAME)?;

        let ports = midi_in.ports();
        if ports.is_empty() {
            tracing::info!("No MIDI port detected, continuing without MIDI");
            return Ok(Self {
                _connection: None,
                port_name: None,
            });
        }

        for (i, port) in ports.iter().enumerate() {
            if let Ok(name) = midi_in.port_name(port) {
                tracing::debug!("MIDI port [{}] {}", i, name);
            }
        }

        let port = &ports[0];
        let port_name = midi_in
            .port_name(port)
            .unwrap_or_else(|_| "Unknown".to_string());

        let mut forwarder = MidiForwarder::new(command_tx, notifications.clone());
        let connection = midi_in
            .connect(
                port,
                PORT_NAME,
                move |_timestamp, message, _| forwarder.handle(message),
                (),
            )
            .map_err(|e| MidiError::Connect(e.to_string()))?;

        tracing::info!("MIDI device started: {}", port_name);
        notifications.notify(Notification::info(
            NotificationCategory::Midi,
            format!("MIDI connected: {}", port_name),
        ));

        Ok(Self {
            _connection: Some(connection),
            port_name: Some(port_name),
        })
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }
}
