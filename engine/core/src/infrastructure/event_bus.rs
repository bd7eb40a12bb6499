// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Memory Events
//
// In-memory event streaming using tokio broadcast channels. Observers (CLI
// tailing, API streaming, tests) subscribe to all events or to one judge.
// Events are not persisted; a lagging receiver loses the oldest events.

use crate::domain::events::MemoryEvent;
use crate::domain::judge::JudgeName;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Event bus for publishing and subscribing to memory events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<MemoryEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: MemoryEvent) {
        debug!(event_type = event.event_type(), judge = %event.judge_name(), "Publishing event");

        // send() only fails when nobody is listening
        if self.sender.send(event).is_err() {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all memory events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to events of a single judge
    pub fn subscribe_judge(&self, judge_name: JudgeName) -> JudgeEventReceiver {
        JudgeEventReceiver {
            receiver: self.sender.subscribe(),
            judge_name,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all memory events
pub struct EventReceiver {
    receiver: broadcast::Receiver<MemoryEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<MemoryEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<MemoryEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver filtered to a single judge
pub struct JudgeEventReceiver {
    receiver: broadcast::Receiver<MemoryEvent>,
    judge_name: JudgeName,
}

impl JudgeEventReceiver {
    pub async fn recv(&mut self) -> Result<MemoryEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.judge_name() == &self.judge_name {
                return Ok(event);
            }
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn created(name: &str) -> MemoryEvent {
        MemoryEvent::JudgeCreated {
            judge_name: JudgeName::parse(name).unwrap(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.publish(created("safety"));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event_type(), "judge_created");
        assert_eq!(received.judge_name().as_str(), "safety");
    }

    #[tokio::test]
    async fn test_judge_filtering() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_judge(JudgeName::parse("tone").unwrap());

        event_bus.publish(created("safety"));
        event_bus.publish(created("tone"));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.judge_name().as_str(), "tone");
    }

    #[tokio::test]
    async fn test_multiple_subscribers_and_no_subscribers() {
        let event_bus = EventBus::new(10);
        // Publishing with nobody listening is not an error
        event_bus.publish(created("safety"));

        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();
        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish(created("safety"));
        assert!(receiver1.recv().await.is_ok());
        assert!(receiver2.recv().await.is_ok());
        assert!(matches!(receiver1.try_recv(), Err(EventBusError::Empty)));
    }
}
