//! Destinations for domain events.
//!
//! The engine publishes after a transition commits and never waits on a
//! sink; delivery to people (mail, SMS) is somebody else's subscriber.

use tokio::sync::broadcast;

use rendezvous_core::event::DomainEvent;

pub trait EventSink: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

/// ## Summary
/// Fans events out to every current subscriber.
///
/// Subscribers that fall more than `capacity` events behind lose the oldest
/// ones. Events published while nobody subscribes are dropped.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventSink {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: DomainEvent) {
        let name = event.name();
        let appointment_id = event.appointment_id();
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::trace!(event = name, %appointment_id, receivers, "Event published");
            }
            Err(_) => {
                tracing::trace!(event = name, %appointment_id, "Event dropped, no subscribers");
            }
        }
    }
}

/// Writes every event as a structured log record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn publish(&self, event: DomainEvent) {
        let appointment = event.appointment();
        tracing::info!(
            event = event.name(),
            appointment_id = %appointment.id,
            agent_id = %appointment.agent_id,
            status = %appointment.status,
            "Appointment event"
        );
    }
}
