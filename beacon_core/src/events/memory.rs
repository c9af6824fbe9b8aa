use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::models::{Event, EventQuery};
use super::traits::EventBus;
use super::{Error, Result};

/// In-memory EventBus for embedding and tests.
///
/// Keeps every event for the lifetime of the process, in publish order.
#[derive(Clone, Default)]
pub struct MemoryEventBus {
    events: Arc<Mutex<Vec<Event>>>,
    max_payload_bytes: Option<usize>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_payload_bytes(mut self, max: usize) -> Self {
        self.max_payload_bytes = Some(max);
        self
    }

    /// Snapshot of all events (primarily for tests).
    pub async fn all_events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: Event) -> Result<String> {
        if event.topic.trim().is_empty() {
            return Err(Error::InvalidTopic);
        }
        if let Some(max) = self.max_payload_bytes {
            if serde_json::to_vec(&event.payload)?.len() > max {
                return Err(Error::PayloadTooLarge);
            }
        }
        let id = event.id.clone();
        self.events.lock().await.push(event);
        Ok(id)
    }

    async fn query(&self, filter: EventQuery) -> Result<Vec<Event>> {
        filter.validate()?;
        let events = self.events.lock().await;
        Ok(events
            .iter()
            .filter(|e| filter.matches(e))
            .take(filter.limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn query_filters_by_topic_in_publish_order() {
        let bus = MemoryEventBus::new();
        for (topic, n) in [("a.one", 1), ("b.two", 2), ("a.one", 3)] {
            let ev = Event::new(topic, "test", serde_json::json!({ "n": n }), format!("k{n}"))
                .unwrap();
            bus.publish(ev).await.unwrap();
        }

        let got = bus.query(EventQuery::topic("a.one")).await.unwrap();
        let ns: Vec<i64> = got
            .iter()
            .map(|e| e.payload["n"].as_i64().unwrap())
            .collect();
        assert_eq!(ns, vec![1, 3]);
    }

    #[tokio::test]
    async fn rejects_oversized_payloads() {
        let bus = MemoryEventBus::new().with_max_payload_bytes(8);
        let ev = Event::new("a.b", "test", serde_json::json!({ "long": "xxxxxxxxxx" }), "k")
            .unwrap();
        assert!(matches!(bus.publish(ev).await, Err(Error::PayloadTooLarge)));
        assert!(bus.all_events().await.is_empty());
    }
}
