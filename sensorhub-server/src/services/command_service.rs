use async_trait::async_trait;
use sensorhub_api::models::LedState;

/// What happened to a command on our side of the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Queued on the live connection. The device may still never apply it.
    Published,
    /// No broker connection, nothing was sent.
    Disconnected,
    /// The client refused the request, e.g. its outgoing queue is full.
    Rejected,
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published)
    }
}

/// Sends actuator commands to devices. One attempt, no queuing.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish_led(&self, state: LedState) -> PublishOutcome;
}

