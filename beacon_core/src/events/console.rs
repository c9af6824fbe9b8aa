use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::models::Event;
use super::traits::EventBus;
use super::{Error, Result};

#[async_trait]
pub trait LineWriter: Send + Sync {
    async fn write_line(&self, line: String) -> Result<()>;
}

struct StdoutWriter;

#[async_trait]
impl LineWriter for StdoutWriter {
    async fn write_line(&self, line: String) -> Result<()> {
        let mut out = tokio::io::stdout();
        out.write_all(line.as_bytes())
            .await
            .map_err(|e| Error::message(format!("stdout write: {e}")))?;
        out.write_all(b"\n")
            .await
            .map_err(|e| Error::message(format!("stdout write newline: {e}")))?;
        out.flush()
            .await
            .map_err(|e| Error::message(format!("stdout flush: {e}")))?;
        Ok(())
    }
}

/// Writes each published event as one JSON line.
///
/// Writes are serialized so lines from concurrent streams never interleave.
#[derive(Clone)]
pub struct ConsoleEventBus {
    writer: Arc<dyn LineWriter>,
    write_lock: Arc<Mutex<()>>,
}

impl ConsoleEventBus {
    pub fn stdout() -> Self {
        Self::new(Arc::new(StdoutWriter))
    }

    pub fn new(writer: Arc<dyn LineWriter>) -> Self {
        Self {
            writer,
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[async_trait]
impl EventBus for ConsoleEventBus {
    #[tracing::instrument(level = "debug", skip_all, fields(topic = %event.topic))]
    async fn publish(&self, event: Event) -> Result<String> {
        let line = serde_json::to_string(&serde_json::json!({
            "type": "beacon.event",
            "event": event,
        }))?;
        let _guard = self.write_lock.lock().await;
        self.writer.write_line(line).await?;
        Ok(event.id)
    }
}
