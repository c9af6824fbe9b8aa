use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// An event handed to the outbound bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// ULID (sortable by time).
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Dot-delimited event name, e.g. "notifications.user.events".
    pub topic: String,
    /// Sender tag of the producing subsystem.
    pub source: String,
    pub payload: serde_json::Value,
    /// Idempotency key for consumer-side dedupe.
    pub dedupe_key: String,
}

impl Event {
    #[tracing::instrument(level = "debug", skip(payload))]
    pub fn new(
        topic: impl Into<String> + std::fmt::Debug,
        source: impl Into<String> + std::fmt::Debug,
        payload: serde_json::Value,
        dedupe_key: impl Into<String> + std::fmt::Debug,
    ) -> Result<Self> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(Error::InvalidTopic);
        }

        let source = source.into();
        if source.trim().is_empty() {
            return Err(Error::InvalidSource);
        }

        let dedupe_key = dedupe_key.into();
        if dedupe_key.trim().is_empty() {
            return Err(Error::InvalidDedupeKey);
        }

        Ok(Self {
            id: ulid::Ulid::new().to_string(),
            timestamp: Utc::now(),
            topic,
            source,
            payload,
            dedupe_key,
        })
    }

    /// Build an event whose payload is the JSON form of `data`.
    pub fn from_data<T: Serialize>(
        topic: &str,
        source: &str,
        data: &T,
        dedupe_key: impl Into<String>,
    ) -> Result<Self> {
        let payload = serde_json::to_value(data)?;
        Self::new(topic, source, payload, dedupe_key.into())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventQuery {
    pub topic: Option<String>,
    pub source: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl EventQuery {
    pub fn topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            limit: usize::MAX,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(Error::InvalidQuery);
        }
        if self.topic.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(Error::InvalidQuery);
        }
        Ok(())
    }

    pub fn matches(&self, event: &Event) -> bool {
        if let Some(topic) = &self.topic {
            if &event.topic != topic {
                return false;
            }
        }
        if let Some(source) = &self.source {
            if &event.source != source {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.timestamp < since {
                return false;
            }
        }
        true
    }
}
