//! # Kestrel Event System
//!
//! Three event channels with different lifetimes:
//!
//! ```text
//!   systems / flush ──push──> FrameEvents ──────────┐
//!                                                    ├──publish──> EventBus ──> render / audio / UI
//!   spawn plans ─────push──> DelayedEventQueue ──────┘
//!                               │
//!                               └── readable on frame N+1 by systems
//! ```
//!
//! - [`FrameEvents`] lives for one frame and is cleared when the next begins.
//! - [`DelayedEventQueue`] holds events written during frame N that systems
//!   read during frame N+1.
//! - [`EventBus`] mirrors both to external consumers over a bounded
//!   crossbeam channel. A full channel drops the event rather than stalling
//!   the frame.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use kestrel_core::{EntityHandle, Guid, SpawnProfileId, Vec3};
use tracing::warn;

use crate::spawn::SpawnRuleId;
use crate::state::GameState;

/// Payload shared by solid and trigger collisions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionEvent {
    /// The reporting entity.
    pub source: EntityHandle,
    /// GUID of the reporting entity.
    pub source_guid: Guid,
    /// The other entity.
    pub target: EntityHandle,
    /// GUID of the other entity.
    pub target_guid: Guid,
    /// Center of the overlap region.
    pub contact_point: Vec3,
}

/// Outcome of a scheduled spawn plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnPlanCommandExecutedEvent {
    /// Rule that requested the plan.
    pub rule: SpawnRuleId,
    /// Entities actually spawned, which pool exhaustion can make lower than
    /// the requested amount.
    pub spawn_count: usize,
}

/// Everything the engine reports about a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    /// Overlap with at least one side's trigger mask matching.
    TriggerCollision(CollisionEvent),

    /// Overlap with both sides' solid masks matching.
    SolidCollision(CollisionEvent),

    /// A spawn plan finished. Delivered through the delayed queue.
    SpawnPlanCommandExecuted(SpawnPlanCommandExecutedEvent),

    /// A pooled object was positioned, initialized and activated.
    EntitySpawned {
        /// Spawned object.
        guid: Guid,
        /// Profile used.
        profile: SpawnProfileId,
        /// Final position.
        position: Vec3,
    },

    /// A pooled object returned to its pool.
    EntityDespawned {
        /// Despawned object.
        guid: Guid,
        /// Profile that had spawned it.
        profile: Option<SpawnProfileId>,
    },

    /// The game state machine moved.
    GameStateChanged {
        /// Previous state.
        from: GameState,
        /// New state.
        to: GameState,
    },
}

/// Events raised during the current frame.
#[derive(Clone, Debug, Default)]
pub struct FrameEvents {
    events: Vec<GameEvent>,
}

impl FrameEvents {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event.
    #[inline]
    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Events in the order they were raised.
    #[must_use]
    pub fn as_slice(&self) -> &[GameEvent] {
        &self.events
    }

    /// Iterates over the events.
    pub fn iter(&self) -> std::slice::Iter<'_, GameEvent> {
        self.events.iter()
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when no event was raised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drops every event, keeping capacity.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl<'a> IntoIterator for &'a FrameEvents {
    type Item = &'a GameEvent;
    type IntoIter = std::slice::Iter<'a, GameEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Events written during one frame and readable during the next.
#[derive(Clone, Debug, Default)]
pub struct DelayedEventQueue {
    /// Written this frame.
    pending: Vec<GameEvent>,
    /// Written last frame.
    readable: Vec<GameEvent>,
}

impl DelayedEventQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an event for the next frame.
    pub fn push(&mut self, event: GameEvent) {
        self.pending.push(event);
    }

    /// Moves this frame's events to the readable side, dropping last frame's.
    pub fn advance(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.readable);
        self.pending.clear();
    }

    /// Events written during the previous frame.
    #[must_use]
    pub fn readable(&self) -> &[GameEvent] {
        &self.readable
    }

    /// Events written during the current frame.
    #[must_use]
    pub fn pending(&self) -> &[GameEvent] {
        &self.pending
    }
}

/// Bounded outbound channel.
///
/// Created once by the game world; consumers clone receivers from it.
pub struct EventBus {
    /// Sender end - held by the frame loop.
    sender: Sender<GameEvent>,
    /// Receiver end - cloned for consumers.
    receiver: Receiver<GameEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum events in flight before new ones are dropped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a sender handle.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }
}

/// Handle for sending events.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<GameEvent>,
}

impl EventSender {
    /// Sends an event without blocking.
    ///
    /// Returns `false` if the channel is full or disconnected; the event is
    /// dropped.
    #[inline]
    pub fn send(&self, event: GameEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(?event, "event bus full; dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle for receiving events.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<GameEvent>,
}

impl EventReceiver {
    /// Receives all pending events without blocking.
    #[inline]
    pub fn drain(&self) -> Vec<GameEvent> {
        let mut events = Vec::with_capacity(self.receiver.len());
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Receives one event without blocking.
    #[inline]
    pub fn try_recv(&self) -> Option<GameEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if there are pending events.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn despawned(n: u128) -> GameEvent {
        GameEvent::EntityDespawned {
            guid: Guid::from_u128(n),
            profile: None,
        }
    }

    #[test]
    fn test_event_send_receive() {
        let bus = EventBus::new(100);
        let sender = bus.sender();
        let receiver = bus.receiver();

        assert!(sender.send(despawned(1)));
        assert!(receiver.has_events());
        assert_eq!(receiver.try_recv(), Some(despawned(1)));
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_full_bus_drops_events() {
        let bus = EventBus::new(2);
        let sender = bus.sender();
        assert!(sender.send(despawned(1)));
        assert!(sender.send(despawned(2)));
        assert!(!sender.send(despawned(3)));

        let received = bus.receiver().drain();
        assert_eq!(received, vec![despawned(1), despawned(2)]);
    }

    #[test]
    fn test_delayed_queue_delivers_next_frame() {
        let mut queue = DelayedEventQueue::new();
        queue.push(despawned(1));
        assert!(queue.readable().is_empty());

        queue.advance();
        assert_eq!(queue.readable(), &[despawned(1)]);
        assert!(queue.pending().is_empty());

        // Not carried past one frame
        queue.advance();
        assert!(queue.readable().is_empty());
    }

    #[test]
    fn test_frame_events_clear() {
        let mut events = FrameEvents::new();
        events.push(despawned(1));
        events.push(despawned(2));
        assert_eq!(events.len(), 2);
        assert_eq!(events.iter().count(), 2);
        events.clear();
        assert!(events.is_empty());
    }
}
