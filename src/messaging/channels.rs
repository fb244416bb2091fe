// Communication channels lock-free
//
// The event queue is one bounded MPSC channel shared by every producer
// (keyboard poller, MIDI callback); the render thread is the single
// consumer and sees commands in the order they arrived, whoever sent them.
// A send on a full queue fails at once and the newest command is dropped,
// so no producer can ever stall the audio thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Producer, Split};

use crate::audio::recorder::RecordingHandoff;
use crate::messaging::command::Command;
use crate::messaging::notification::Notification;

/// Producer handle for one input source
pub struct CommandSender {
    tx: Sender<Command>,
    dropped: u64,
}

impl CommandSender {
    /// Non-blocking send. On overflow the command is dropped and handed
    /// back to the caller.
    pub fn send(&mut self, command: impl Into<Command>) -> Result<(), Command> {
        self.tx.try_send(command.into()).map_err(|e| {
            self.dropped += 1;
            match e {
                TrySendError::Full(command) | TrySendError::Disconnected(command) => command,
            }
        })
    }

    /// Commands from this producer dropped because the queue was full
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}

/// Consumer side of the event queue, owned by the render engine
pub struct CommandReceiver {
    rx: Receiver<Command>,
}

impl CommandReceiver {
    /// Next pending command, oldest first
    #[inline]
    pub fn pop(&mut self) -> Option<Command> {
        self.rx.try_recv().ok()
    }
}

/// Builds the event queue and hands out one sender per producer
pub struct EventQueueBuilder {
    tx: Sender<Command>,
    rx: Receiver<Command>,
}

impl EventQueueBuilder {
    /// `capacity` is shared by all producers
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }

    pub fn producer(&mut self) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
            dropped: 0,
        }
    }

    pub fn build(self) -> CommandReceiver {
        CommandReceiver { rx: self.rx }
    }
}

/// Hand-offs the render thread can hold back while the channel is full
pub const PARKED_HANDOFFS: usize = 4;

/// Render-side end of the recording hand-off channel.
///
/// Buffers never get freed on the audio thread while a parking slot is
/// free; when even the parking is full the loss is counted.
pub struct HandoffSender {
    tx: ringbuf::HeapProd<RecordingHandoff>,
    parked: [Option<RecordingHandoff>; PARKED_HANDOFFS],
    lost: Arc<AtomicU64>,
}

impl HandoffSender {
    pub fn send(&mut self, handoff: RecordingHandoff) {
        self.flush();

        // Parked hand-offs go out first
        let handoff = if self.parked_len() == 0 {
            match self.tx.try_push(handoff) {
                Ok(()) => return,
                Err(handoff) => handoff,
            }
        } else {
            handoff
        };

        match self.parked.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => *slot = Some(handoff),
            None => {
                self.lost.fetch_add(1, Ordering::Relaxed);
                // Freed here, on the render thread
                drop(handoff);
            }
        }
    }

    /// Push parked hand-offs, oldest first, until the channel is full
    pub fn flush(&mut self) {
        let mut sent = 0;
        for slot in self.parked.iter_mut() {
            let Some(handoff) = slot.take() else {
                break;
            };
            if let Err(handoff) = self.tx.try_push(handoff) {
                *slot = Some(handoff);
                break;
            }
            sent += 1;
        }
        // Garde les slots occupés en tête, dans l'ordre d'arrivée
        self.parked.rotate_left(sent);
    }

    pub fn parked_len(&self) -> usize {
        self.parked.iter().filter(|slot| slot.is_some()).count()
    }
}

/// UI-side end of the recording hand-off channel
pub struct HandoffReceiver {
    rx: ringbuf::HeapCons<RecordingHandoff>,
    lost: Arc<AtomicU64>,
}

impl HandoffReceiver {
    pub fn try_recv(&mut self) -> Option<RecordingHandoff> {
        self.rx.try_pop()
    }

    /// Hand-offs dropped on the render thread because nothing had room
    pub fn lost_count(&self) -> u64 {
        self.lost.load(Ordering::Relaxed)
    }
}

pub fn create_handoff_channel(capacity: usize) -> (HandoffSender, HandoffReceiver) {
    let (tx, rx) = HeapRb::<RecordingHandoff>::new(capacity).split();
    let lost = Arc::new(AtomicU64::new(0));
    (
        HandoffSender {
            tx,
            parked: [const { None }; PARKED_HANDOFFS],
            lost: lost.clone(),
        },
        HandoffReceiver { rx, lost },
    )
}

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

/// Shared notification producer for the non-UI threads (stream errors,
/// MIDI callback)
#[derive(Clone)]
pub struct NotificationSender {
    tx: Arc<Mutex<NotificationProducer>>,
}

impl NotificationSender {
    /// Never blocks: gives up when another thread holds the producer or
    /// the ringbuffer is full
    pub fn notify(&self, notification: Notification) -> bool {
        match self.tx.try_lock() {
            Ok(mut tx) => tx.try_push(notification).is_ok(),
            Err(_) => false,
        }
    }
}

pub fn create_notification_channel(capacity: usize) -> (NotificationSender, NotificationConsumer) {
    let (tx, rx) = HeapRb::<Notification>::new(capacity).split();
    (
        NotificationSender {
            tx: Arc::new(Mutex::new(tx)),
        },
        rx,
    )
}
