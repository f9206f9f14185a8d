use crate::constants::system::DEFAULT_EVENT_CHANNEL_CAPACITY;
use crate::models::CaseId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// Fan-out bus for workflow events: stage moves, flag toggles, exclusion changes,
/// batch resets and update notices
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub name: String,
    /// Case the event concerns; `None` for batch and system events
    pub case_id: Option<CaseId>,
    pub context: Value,
    pub published_at: DateTime<Utc>,
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub async fn publish(
        &self,
        event_name: impl Into<String>,
        case_id: Option<CaseId>,
        context: Value,
    ) -> Result<(), PublishError> {
        let event = PublishedEvent {
            name: event_name.into(),
            case_id,
            context,
            published_at: Utc::now(),
        };

        // Nobody listening is fine; the event is simply dropped
        let _ = self.sender.send(event);
        Ok(())
    }

    /// Publish with any serializable payload as the context
    pub async fn publish_with<T: Serialize + ?Sized>(
        &self,
        event_name: impl Into<String>,
        case_id: Option<CaseId>,
        payload: &T,
    ) -> Result<(), PublishError> {
        let context = serde_json::to_value(payload)?;
        self.publish(event_name, case_id, context).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event payload could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}
