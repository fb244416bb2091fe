// Main UI App - Fenêtre egui, clavier et enregistrement
//
// The UI thread is the keyboard producer: every frame it polls which keys
// are down, feeds the KeyboardController and forwards the resulting events
// to its sender on the event queue. It also owns the recording lifecycle
// outside the audio thread: sessions are allocated here, and finished
// captures come back here to be written to disk.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui;
use egui::Key;
use ringbuf::traits::Consumer;

use crate::audio::export::RecordingExporter;
use crate::audio::parameters::SharedSynthState;
use crate::audio::recorder::{Recording, RecordingHandoff, RecordingSession};
use crate::config::SynthConfig;
use crate::messaging::channels::{CommandSender, HandoffReceiver, NotificationConsumer};
use crate::messaging::command::Command;
use crate::messaging::notification::{Notification, NotificationCategory, NotificationLevel};
use crate::synth::oscillator::WaveformType;
use crate::ui::keyboard::{
    ControllerAction, KeySnapshot, KeyboardController, NOTE_KEY_COUNT, NOTE_KEYS,
};

/// Status bar lifetime of a notification
const NOTIFICATION_LIFETIME: Duration = Duration::from_secs(5);

/// How long quitting waits for the audio thread to hand back a recording
const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_millis(500);

const NOTE_EGUI_KEYS: [Key; NOTE_KEY_COUNT] = [
    Key::A,
    Key::W,
    Key::S,
    Key::E,
    Key::D,
    Key::F,
    Key::T,
    Key::G,
    Key::Y,
    Key::H,
    Key::U,
    Key::J,
    Key::K,
];

/// Everything the app needs from `main`
pub struct SynthAppChannels {
    pub command_tx: CommandSender,
    pub handoff_rx: HandoffReceiver,
    pub notification_rx: NotificationConsumer,
}

pub struct SynthApp {
    command_tx: CommandSender,
    shared_state: SharedSynthState,
    controller: KeyboardController,
    handoff_rx: HandoffReceiver,
    exporter: RecordingExporter,
    sample_rate: u32,
    max_record_seconds: f32,
    poll_interval: Duration,
    midi_port: Option<String>,
    // Recording
    recording_since: Option<Instant>,
    awaiting_flush: bool,
    last_export: Option<PathBuf>,
    reported_lost: u64,
    // Shutdown
    shutdown_deadline: Option<Instant>,
    ready_to_close: bool,
    // Notification system
    notification_rx: NotificationConsumer,
    notification_queue: VecDeque<Notification>,
    max_notifications: usize,
}

impl SynthApp {
    pub fn new(
        config: &SynthConfig,
        shared_state: SharedSynthState,
        channels: SynthAppChannels,
        midi_port: Option<String>,
    ) -> Self {
        let controller = KeyboardController::new(shared_state.snapshot());

        Self {
            command_tx: channels.command_tx,
            shared_state,
            controller,
            handoff_rx: channels.handoff_rx,
            exporter: RecordingExporter::new(config.recording_dir.clone()),
            sample_rate: config.sample_rate,
            max_record_seconds: config.max_record_seconds,
            poll_interval: config.poll_interval(),
            midi_port,
            recording_since: None,
            awaiting_flush: false,
            last_export: None,
            reported_lost: 0,
            shutdown_deadline: None,
            ready_to_close: false,
            notification_rx: channels.notification_rx,
            notification_queue: VecDeque::new(),
            max_notifications: 10,
        }
    }

    fn poll_keys(ctx: &egui::Context) -> KeySnapshot {
        ctx.input(|i| {
            // Keys held while the window is unfocused are not reliable
            if !i.focused {
                return KeySnapshot::default();
            }

            let mut notes = [false; NOTE_KEY_COUNT];
            for (down, key) in notes.iter_mut().zip(NOTE_EGUI_KEYS) {
                *down = i.key_down(key);
            }

            KeySnapshot {
                notes,
                volume_up: i.key_down(Key::Plus) || i.key_down(Key::Equals),
                volume_down: i.key_down(Key::Minus),
                select_sine: i.key_down(Key::Z),
                select_square: i.key_down(Key::X),
                select_saw: i.key_down(Key::C),
                octave_up: i.key_down(Key::ArrowUp),
                octave_down: i.key_down(Key::ArrowDown),
                record: i.key_down(Key::R),
                quit: i.key_down(Key::Escape),
            }
        })
    }

    fn dispatch(&mut self, action: ControllerAction) {
        match action {
            ControllerAction::Note(event) => {
                if self.command_tx.send(event).is_err() {
                    tracing::warn!("Event queue full, {:?} dropped", event);
                }
            }
            ControllerAction::StateChanged(state) => self.shared_state.publish(state),
            ControllerAction::ToggleRecording => self.toggle_recording(),
            ControllerAction::Quit => self.begin_shutdown(),
        }
    }

    fn toggle_recording(&mut self) {
        if self.recording_since.is_some() {
            self.stop_recording();
        } else {
            self.start_recording();
        }
    }

    fn start_recording(&mut self) {
        // Allocation happens here, never on the audio thread
        let session = match RecordingSession::new(self.max_record_seconds, self.sample_rate) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Recording not started: {}", e);
                self.push_notification(Notification::error(
                    NotificationCategory::Recording,
                    format!("Recording not started: {}", e),
                ));
                return;
            }
        };

        match self.command_tx.send(Command::StartRecording(session)) {
            Ok(()) => {
                tracing::info!("Recording started...");
                self.recording_since = Some(Instant::now());
            }
            Err(_) => {
                tracing::warn!("Event queue full, recording not started");
                self.push_notification(Notification::warning(
                    NotificationCategory::Recording,
                    "Event queue full, recording not started",
                ));
            }
        }
    }

    fn stop_recording(&mut self) {
        match self.command_tx.send(Command::StopRecording) {
            Ok(()) => {
                tracing::info!("Recording stopped.");
                self.recording_since = None;
                self.awaiting_flush = true;
            }
            Err(_) => {
                tracing::warn!("Event queue full, recording still running");
                self.push_notification(Notification::warning(
                    NotificationCategory::Recording,
                    "Event queue full, press R again to stop",
                ));
            }
        }
    }

    /// Collect buffers coming back from the audio thread
    fn drain_handoffs(&mut self) {
        while let Some(handoff) = self.handoff_rx.try_recv() {
            match handoff {
                RecordingHandoff::Finished(recording) => {
                    self.awaiting_flush = false;
                    self.export(&recording);
                }
                RecordingHandoff::Rejected(session) => {
                    tracing::debug!(
                        "Discarded duplicate recording session ({} samples)",
                        session.max_samples()
                    );
                }
            }
        }

        let lost = self.handoff_rx.lost_count();
        if lost > self.reported_lost {
            tracing::error!(
                "{} recording buffers lost on the audio thread",
                lost - self.reported_lost
            );
            self.reported_lost = lost;
            self.push_notification(Notification::error(
                NotificationCategory::Recording,
                "Recording lost: hand-off queue full",
            ));
        }
    }

    fn export(&mut self, recording: &Recording) {
        match self.exporter.export(recording) {
            Ok(path) => {
                self.push_notification(Notification::info(
                    NotificationCategory::Recording,
                    format!("Saved recording to {}", path.display()),
                ));
                self.last_export = Some(path);
            }
            Err(e) => {
                tracing::error!("Could not save recording: {}", e);
                self.push_notification(Notification::error(
                    NotificationCategory::Recording,
                    format!("Could not save recording: {}", e),
                ));
            }
        }
    }

    /// Silence held keys and flush an in-progress recording before closing
    fn begin_shutdown(&mut self) {
        if self.shutdown_deadline.is_some() {
            return;
        }
        tracing::info!("Shutting down");

        for event in self.controller.release_all() {
            let _ = self.command_tx.send(event);
        }
        if self.recording_since.is_some() {
            self.stop_recording();
        }
        self.shutdown_deadline = Some(Instant::now() + SHUTDOWN_FLUSH_TIMEOUT);
    }

    fn check_shutdown(&mut self, ctx: &egui::Context) {
        let Some(deadline) = self.shutdown_deadline else {
            return;
        };

        let timed_out = Instant::now() >= deadline;
        if self.awaiting_flush && !timed_out {
            return;
        }
        if self.awaiting_flush {
            tracing::error!("Audio thread did not hand back the recording, it is lost");
        }

        self.ready_to_close = true;
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }

    fn push_notification(&mut self, notification: Notification) {
        self.notification_queue.push_back(notification);
        if self.notification_queue.len() > self.max_notifications {
            self.notification_queue.pop_front();
        }
    }

    /// Lit les nouvelles notifications depuis le ringbuffer
    fn update_notifications(&mut self) {
        while let Some(notification) = self.notification_rx.try_pop() {
            self.push_notification(notification);
        }
    }

    /// Notifications de moins de 5 secondes, les plus récentes d'abord
    fn get_recent_notifications(&self) -> Vec<&Notification> {
        self.notification_queue
            .iter()
            .rev()
            .filter(|n| n.is_recent(NOTIFICATION_LIFETIME))
            .take(3)
            .collect()
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        let state = self.controller.state();

        ui.horizontal(|ui| {
            ui.label("Volume:");
            let mut volume = state.master_volume;
            if ui.add(egui::Slider::new(&mut volume, 0.0..=1.0)).changed() {
                if let Some(action) = self.controller.set_volume(volume) {
                    self.dispatch(action);
                }
            }
        });

        ui.horizontal(|ui| {
            ui.label("Waveform:");
            let mut waveform = state.waveform;
            for candidate in WaveformType::ALL {
                ui.selectable_value(&mut waveform, candidate, candidate.name());
            }
            if let Some(action) = self.controller.set_waveform(waveform) {
                self.dispatch(action);
            }
        });

        ui.label(format!("Octave: {:+}", state.octave_shift));
    }

    fn draw_keyboard(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for (index, (key, _)) in NOTE_KEYS.iter().enumerate() {
                let is_black = matches!(key, 'W' | 'E' | 'T' | 'Y' | 'U');
                let fill = match (self.controller.is_held(index), is_black) {
                    (true, _) => egui::Color32::from_rgb(150, 150, 255),
                    (false, true) => egui::Color32::from_gray(50),
                    (false, false) => egui::Color32::WHITE,
                };
                let text_color = if is_black && !self.controller.is_held(index) {
                    egui::Color32::WHITE
                } else {
                    egui::Color32::BLACK
                };
                let label = egui::RichText::new(key.to_string()).color(text_color);
                ui.add(
                    egui::Button::new(label)
                        .fill(fill)
                        .stroke(egui::Stroke::new(1.0, egui::Color32::BLACK))
                        .min_size(egui::vec2(36.0, 80.0)),
                );
            }
        });
    }

    fn draw_recording(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            match self.recording_since {
                Some(since) => {
                    let elapsed = since.elapsed().as_secs_f32();
                    ui.colored_label(egui::Color32::RED, "● REC");
                    if elapsed >= self.max_record_seconds {
                        ui.label(format!("{:.0}s (limit reached)", self.max_record_seconds));
                    } else {
                        ui.label(format!("{:.1}s / {:.0}s", elapsed, self.max_record_seconds));
                    }
                }
                None => {
                    ui.colored_label(egui::Color32::GRAY, "○ Not recording");
                }
            }
            if let Some(path) = &self.last_export {
                ui.label(format!("Last: {}", path.display()));
            }
        });
    }

    fn draw_status_bar(&self, ui: &mut egui::Ui) {
        ui.separator();
        ui.horizontal(|ui| {
            let recent_notifications = self.get_recent_notifications();

            if recent_notifications.is_empty() {
                ui.label("Ready");
            } else {
                for notification in recent_notifications {
                    let color = match notification.level {
                        NotificationLevel::Info => egui::Color32::from_rgb(100, 150, 255),
                        NotificationLevel::Warning => egui::Color32::from_rgb(255, 165, 0),
                        NotificationLevel::Error => egui::Color32::RED,
                    };
                    ui.colored_label(color, notification.to_string());
                    ui.add_space(10.0);
                }
            }
        });
    }
}

impl eframe::App for SynthApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Keep polling the keyboard even without input events
        ctx.request_repaint_after(self.poll_interval);

        if ctx.input(|i| i.viewport().close_requested()) && !self.ready_to_close {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.begin_shutdown();
        }

        if self.shutdown_deadline.is_none() {
            let snapshot = Self::poll_keys(ctx);
            for action in self.controller.update(&snapshot) {
                self.dispatch(action);
            }
        }

        self.drain_handoffs();
        self.update_notifications();
        self.check_shutdown(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("keysynth");
            ui.separator();

            self.draw_controls(ui);
            ui.add_space(10.0);
            self.draw_keyboard(ui);
            ui.add_space(10.0);
            self.draw_recording(ui);

            ui.add_space(10.0);
            ui.separator();
            ui.label("Keys A to K (white) and W to U (black) play notes.");
            ui.label("Z/X/C waveform, +/- volume, Up/Down octave, R record, Esc quit.");
            ui.label(match &self.midi_port {
                Some(port) => format!("MIDI: {}", port),
                None => "MIDI: not connected".to_string(),
            });
            let dropped = self.command_tx.dropped_count();
            if dropped > 0 {
                ui.colored_label(
                    egui::Color32::from_rgb(255, 165, 0),
                    format!("{} keyboard events dropped (queue full)", dropped),
                );
            }

            self.draw_status_bar(ui);
        });
    }
}
