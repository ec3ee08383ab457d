//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the observer contract between the monitor core and its
//! presentation layers. It is designed to be shared via `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use scada_core::lifecycle::{SamplerStatus, StopReason};
use scada_core::reading::Reading;
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// MonitorEvent
// ---------------------------------------------------------------------------

/// What happened. Serialized with a `type` tag.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEventKind {
    /// A reading was appended to the store.
    ReadingRecorded { reading: Reading },

    /// A reading breached at least one threshold. `reading` is `None` when
    /// the sampler could not store it before shutting down.
    ThresholdWarning {
        reading: Option<Reading>,
        message: String,
    },

    /// A threshold breach stopped the sampler session. Terminal for that session.
    CriticalShutdown { message: String },

    /// The sampler could not append a reading; it retries on its next tick.
    StoreFailure { error: String },

    /// The sampler moved to a new lifecycle state.
    LifecycleChanged {
        status: SamplerStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<StopReason>,
    },

    /// The sensor's motor flag flipped.
    MotorChanged { motor_on: bool },
}

/// A monitor event for a single sensor.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorEvent {
    pub sensor_id: String,

    #[serde(flatten)]
    pub kind: MonitorEventKind,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl MonitorEvent {
    pub fn new(sensor_id: impl Into<String>, kind: MonitorEventKind) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Whether this event is a critical shutdown notification.
    pub fn is_critical(&self) -> bool {
        matches!(self.kind, MonitorEventKind::CriticalShutdown { .. })
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use scada_events::{EventBus, MonitorEvent, MonitorEventKind};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(MonitorEvent::new("S1", MonitorEventKind::MotorChanged { motor_on: true }));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Dropped silently when nobody is subscribed.
    pub fn publish(&self, event: MonitorEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Monitor event dropped: no subscribers");
        }
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
