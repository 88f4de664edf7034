//! Engine notification events
//!
//! The scheduling engine reports externally visible effects through a
//! notification sink. Events are plain data so a host can log them, forward
//! them to a renderer, or serialize them as JSON lines.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Reference to a tree element in an event payload
///
/// `node` is the arena slot of the element; `label` is its `id` attribute when
/// present, otherwise `tag#slot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    /// Arena slot index of the element
    pub node: u32,
    /// Element tag name
    pub tag: String,
    /// Human-readable label (`id` attribute or `tag#slot`)
    pub label: String,
}

/// Notification events emitted by the timed-document engine
///
/// All times are document clock milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// Element was activated (runtime armed, waiting for its begin trigger)
    ElementActivated {
        element: ElementRef,
        time_ms: u64,
    },

    /// Element's begin trigger resolved; its content is now live
    ElementStarted {
        element: ElementRef,
        time_ms: u64,
    },

    /// Element's runtime stopped (duration elapsed, end event, or forced)
    ElementStopped {
        element: ElementRef,
        time_ms: u64,
        /// Stopped by an end trigger, a duration limit or a sibling rather
        /// than by running out of content
        forced: bool,
    },

    /// Element finished
    ElementFinished {
        element: ElementRef,
        time_ms: u64,
    },

    /// Element was deactivated and its effects removed
    ElementDeactivated {
        element: ElementRef,
        time_ms: u64,
    },

    /// An animation element changed (or restored) an attribute on its target
    AttributeChanged {
        target: ElementRef,
        attribute: String,
        /// New value, `None` when the attribute was removed
        value: Option<String>,
        time_ms: u64,
    },

    /// Media content became visible/audible
    MediaShown {
        element: ElementRef,
        src: Option<String>,
        region: Option<String>,
        time_ms: u64,
    },

    /// Media content was removed from presentation
    MediaHidden {
        element: ElementRef,
        time_ms: u64,
    },

    /// The engine asks the host for the intrinsic length of some media
    MediaLengthRequested {
        element: ElementRef,
        src: Option<String>,
        time_ms: u64,
    },

    /// The whole document finished playing
    DocumentFinished {
        time_ms: u64,
    },
}

impl EngineEvent {
    /// Document clock time at which the event was emitted
    pub fn time_ms(&self) -> u64 {
        match self {
            EngineEvent::ElementActivated { time_ms, .. }
            | EngineEvent::ElementStarted { time_ms, .. }
            | EngineEvent::ElementStopped { time_ms, .. }
            | EngineEvent::ElementFinished { time_ms, .. }
            | EngineEvent::ElementDeactivated { time_ms, .. }
            | EngineEvent::AttributeChanged { time_ms, .. }
            | EngineEvent::MediaShown { time_ms, .. }
            | EngineEvent::MediaHidden { time_ms, .. }
            | EngineEvent::MediaLengthRequested { time_ms, .. }
            | EngineEvent::DocumentFinished { time_ms } => *time_ms,
        }
    }

    /// Label of the element the event is about, if any
    pub fn label(&self) -> Option<&str> {
        match self {
            EngineEvent::ElementActivated { element, .. }
            | EngineEvent::ElementStarted { element, .. }
            | EngineEvent::ElementStopped { element, .. }
            | EngineEvent::ElementFinished { element, .. }
            | EngineEvent::ElementDeactivated { element, .. }
            | EngineEvent::MediaShown { element, .. }
            | EngineEvent::MediaHidden { element, .. }
            | EngineEvent::MediaLengthRequested { element, .. } => Some(&element.label),
            EngineEvent::AttributeChanged { target, .. } => Some(&target.label),
            EngineEvent::DocumentFinished { .. } => None,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Event distribution bus for engine notifications
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the engine)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// The engine itself is single-threaded; the bus is how a host fans the
/// engine's notifications out to printers, renderers and tests.
///
/// # Examples
///
/// ```
/// use smil_common::events::{EngineEvent, EventBus};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit(EngineEvent::DocumentFinished { time_ms: 2_000 }).ok();
/// assert!(matches!(rx.try_recv(), Ok(EngineEvent::DocumentFinished { time_ms: 2_000 })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: EngineEvent,
    ) -> Result<usize, broadcast::error::SendError<EngineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
