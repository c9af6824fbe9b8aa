use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::Result;
use crate::events::models::Event;
use crate::events::traits::EventBus;
use crate::models::{RoomId, SenderIdentity};
use crate::notifications::traits::NoticeSender;

/// Sent once when a stream is disabled after sustained fetch failures.
pub const DISABLED_NOTICE: &str = "The bridge could not fetch your notifications after repeated \
attempts and has disabled them. Please verify your credentials are still valid, then turn \
notifications back on.";

/// Topic the chat delivery collaborator consumes.
pub const NOTICE_TOPIC: &str = "matrix.message";

/// Publishes notices onto the event bus as `m.notice` room messages.
#[derive(Clone)]
pub struct BusNoticeSender {
    bus: Arc<dyn EventBus>,
    sender: SenderIdentity,
}

impl BusNoticeSender {
    pub fn new(bus: Arc<dyn EventBus>, sender: SenderIdentity) -> Self {
        Self { bus, sender }
    }
}

#[async_trait]
impl NoticeSender for BusNoticeSender {
    #[tracing::instrument(level = "debug", skip(self, body), fields(room_id = %room_id))]
    async fn send_notice(&self, room_id: &RoomId, body: &str) -> Result<()> {
        let payload = serde_json::json!({
            "roomId": room_id,
            "message": {
                "msgtype": "m.notice",
                "body": body,
            },
        });
        let ev = Event::new(
            NOTICE_TOPIC,
            self.sender.tag(),
            payload,
            format!("notice:{room_id}:{}", ulid::Ulid::new()),
        )?;
        self.bus.publish(ev).await?;
        Ok(())
    }
}

/// Records notices in memory (tests and dry runs).
#[derive(Clone, Default)]
pub struct MemoryNoticeSender {
    sent: Arc<Mutex<Vec<(RoomId, String)>>>,
}

impl MemoryNoticeSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<(RoomId, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NoticeSender for MemoryNoticeSender {
    async fn send_notice(&self, room_id: &RoomId, body: &str) -> Result<()> {
        self.sent
            .lock()
            .await
            .push((room_id.clone(), body.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::memory::MemoryEventBus;
    use crate::events::models::EventQuery;

    #[tokio::test]
    async fn bus_notice_is_an_m_notice_room_message() {
        let bus = MemoryEventBus::new();
        let notices = BusNoticeSender::new(
            Arc::new(bus.clone()),
            SenderIdentity::system("notifications:github"),
        );
        notices
            .send_notice(&RoomId::from("!room:example.org"), DISABLED_NOTICE)
            .await
            .unwrap();

        let events = bus.query(EventQuery::topic(NOTICE_TOPIC)).await.unwrap();
        assert_eq!(events.len(), 1);
        let ev = &events[0];
        assert_eq!(ev.source, "notifications:github");
        assert_eq!(ev.payload["roomId"], "!room:example.org");
        assert_eq!(ev.payload["message"]["msgtype"], "m.notice");
        assert_eq!(ev.payload["message"]["body"], DISABLED_NOTICE);
    }
}
