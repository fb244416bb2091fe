// Notifications utilisateur - status bar messages from any thread
//
// Audio stream errors, MIDI problems and recording results all end up in
// the status bar. Notifications age out on the UI side; the producer never
// waits for them to be read.

use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Which part of the synth a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    /// Output device and stream
    Audio,
    /// MIDI port and MIDI event flow
    Midi,
    /// Capture and WAV export
    Recording,
}

impl NotificationCategory {
    pub fn label(self) -> &'static str {
        match self {
            NotificationCategory::Audio => "Audio",
            NotificationCategory::Midi => "MIDI",
            NotificationCategory::Recording => "Rec",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub category: NotificationCategory,
    pub message: String,
    created: Instant,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        category: NotificationCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            category,
            message: message.into(),
            created: Instant::now(),
        }
    }

    pub fn info(category: NotificationCategory, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, category, message)
    }

    pub fn warning(category: NotificationCategory, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, category, message)
    }

    pub fn error(category: NotificationCategory, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, category, message)
    }

    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }

    pub fn is_recent(&self, max_age: Duration) -> bool {
        self.age() < max_age
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category.label(), self.message)
    }
}
