use async_trait::async_trait;

use super::Result;
use super::models::{Event, EventQuery};

/// Append-only outbound sink for bridge events.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event; returns its id.
    ///
    /// Events published from one task must be observable in publish order.
    async fn publish(&self, event: Event) -> Result<String>;

    /// Query previously published events (replay, debugging, tests).
    ///
    /// Fire-and-forget transports may not retain anything.
    async fn query(&self, _filter: EventQuery) -> Result<Vec<Event>> {
        Ok(Vec::new())
    }
}
