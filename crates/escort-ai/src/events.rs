//! Event bus carrying fire-and-forget notifications to collaborators.
//!
//! Audio cues and lifecycle notifications are published at state-transition
//! edges and drained by the driver once per tick. Nothing in the behaviour
//! layer waits on a consumer.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use escort_common::{CheckpointId, EntityId, SpawnPointId};

/// Sound cues requested by the behaviour layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCue {
    /// The companion noticed a threat
    ThreatDetected,
    /// The companion reached a new checkpoint
    CheckpointReached,
    /// The companion re-barks while waiting for the player
    WaitingBark,
    /// A hostile was hit
    HostileHit,
    /// A hostile started dying
    HostileDied,
    /// The elite entered its second phase
    PhaseTransition,
    /// The companion was lost
    CompanionDied,
}

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Play a sound
    Audio(AudioCue),
    /// A hostile was created by a spawn point
    HostileSpawned {
        /// Hostile id
        entity_id: EntityId,
        /// Spawn point that created it
        spawn_point: SpawnPointId,
    },
    /// A hostile left the level
    HostileRemoved {
        /// Hostile id
        entity_id: EntityId,
    },
    /// The companion reached a checkpoint
    CheckpointReached {
        /// Checkpoint number
        checkpoint: CheckpointId,
    },
    /// The elite finished its second death
    BossDefeated,
    /// The companion died or was lost
    CompanionLost,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<GameEvent>,
    /// Receiver for collecting events
    receiver: Receiver<GameEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: GameEvent) {
        // Non-blocking send - if full, event is dropped
        let _ = self.sender.try_send(event);
    }

    /// Publishes an audio cue.
    pub fn cue(&self, cue: AudioCue) {
        self.publish(GameEvent::Audio(cue));
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<GameEvent> {
        self.sender.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain_in_order() {
        let bus = EventBus::new(8);
        bus.cue(AudioCue::ThreatDetected);
        bus.publish(GameEvent::BossDefeated);
        assert_eq!(bus.pending_count(), 2);

        let events = bus.drain();
        assert_eq!(
            events,
            vec![GameEvent::Audio(AudioCue::ThreatDetected), GameEvent::BossDefeated]
        );
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_events() {
        let bus = EventBus::new(2);
        for _ in 0..5 {
            bus.publish(GameEvent::CompanionLost);
        }
        assert_eq!(bus.capacity(), 2);
        assert_eq!(bus.drain().len(), 2);
    }

    #[test]
    fn test_sender_handle_publishes() {
        let bus = EventBus::default();
        let sender = bus.sender();
        sender
            .try_send(GameEvent::CheckpointReached {
                checkpoint: CheckpointId::new(2),
            })
            .expect("bus has room");
        assert_eq!(bus.pending_count(), 1);
    }
}
