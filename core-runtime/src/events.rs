//! # Event Bus System
//!
//! Speaker lifecycle notifications delivered over `broadcast` channels.
//!
//! Every speaker owns one [`EventBus`]. Listeners subscribe independently and
//! each receives every event emitted after it subscribed:
//!
//! ```text
//! ┌─────────┐   emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ Speaker ├─────────>│ EventBus  ├────────────>│ Subscriber │
//! └─────────┘          │(broadcast)├────────────>│ Subscriber │
//!                      └───────────┘             └────────────┘
//! ```
//!
//! The controlling thread of the output core is not async, so besides the
//! awaitable [`EventStream::recv`] the stream offers a non-blocking
//! [`EventStream::try_recv`] for draining events between loop turns.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, EventStream, SpeakerEvent};
//!
//! let bus = EventBus::new(16);
//! let mut stream = EventStream::new(bus.subscribe());
//!
//! bus.emit(SpeakerEvent::Open).ok();
//! assert_eq!(stream.try_recv().unwrap().unwrap(), SpeakerEvent::Open);
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal.
//! - **`RecvError::Closed`**: the bus was dropped, i.e. the speaker is gone.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

/// Lifecycle event of a speaker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SpeakerEvent {
    /// The native stream was opened.
    Open,
    /// A piece of a chunk was fully written and the sink can take more.
    Drain,
    /// A flush was requested; the speaker closes right after.
    Flush,
    /// The speaker closed. Emitted at most once per speaker.
    Close,
    /// A write came back short or failed.
    Error {
        /// Human-readable error message.
        message: String,
    },
}

impl SpeakerEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            SpeakerEvent::Open => "Output stream opened",
            SpeakerEvent::Drain => "Output ready for more data",
            SpeakerEvent::Flush => "Output flushed",
            SpeakerEvent::Close => "Output closed",
            SpeakerEvent::Error { .. } => "Output error",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            SpeakerEvent::Error { .. } => EventSeverity::Error,
            SpeakerEvent::Open | SpeakerEvent::Close => EventSeverity::Info,
            SpeakerEvent::Drain | SpeakerEvent::Flush => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Central event bus for speaker events.
///
/// Cloning the bus yields another handle to the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SpeakerEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per
    /// subscriber. Subscribers further behind get `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if nobody is listening.
    pub fn emit(&self, event: SpeakerEvent) -> Result<usize, SendError<SpeakerEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<SpeakerEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&SpeakerEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, SpeakerEvent};
///
/// let bus = EventBus::default();
/// let errors = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, SpeakerEvent::Error { .. }));
/// ```
pub struct EventStream {
    receiver: Receiver<SpeakerEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<SpeakerEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&SpeakerEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &SpeakerEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if the bus was dropped.
    pub async fn recv(&mut self) -> Result<SpeakerEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<SpeakerEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every event currently available, skipping lag notifications.
    pub fn drain(&mut self) -> Vec<SpeakerEvent> {
        let mut events = Vec::new();
        while let Some(next) = self.try_recv() {
            match next {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
