use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::events::models::Event;
use crate::events::traits::EventBus;
use crate::models::{SenderIdentity, UserId};
use crate::notifications::clock::Clock;
use crate::notifications::config::PollerConfig;
use crate::notifications::enrich::NotificationEnricher;
use crate::notifications::models::{Notification, PublishedBatch, StreamState};
use crate::notifications::traits::NotificationsApi;

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Fetched, enriched and handed the batch to the bus.
    Published { event_id: String, events: usize },
    /// The notification list request failed; nothing was published.
    FetchFailed { error: String },
    /// The fetch succeeded but the bus rejected the batch.
    PublishFailed { error: String },
}

/// Summary of a completed cycle, broadcast to scheduler subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub user_id: UserId,
    pub outcome: CycleOutcome,
    pub failure_count: u32,
    pub last_read_ts: i64,
    /// `failure_count` exceeded the configured threshold after this cycle.
    pub threshold_tripped: bool,
}

#[derive(Debug, Clone)]
pub struct CycleResult {
    /// State to install for the next cycle.
    pub state: StreamState,
    pub report: CycleReport,
}

/// Runs one throttle-fetch-enrich-publish pass for a stream.
#[derive(Clone)]
pub struct PollCycleExecutor {
    api: Arc<dyn NotificationsApi>,
    bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    enricher: NotificationEnricher,
    config: PollerConfig,
    sender: SenderIdentity,
}

impl PollCycleExecutor {
    pub fn new(
        api: Arc<dyn NotificationsApi>,
        bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
        config: PollerConfig,
    ) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self {
            enricher: NotificationEnricher::new(api.clone(), config.enrich_concurrency),
            sender: SenderIdentity::system(config.sender.clone()),
            api,
            bus,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Execute one cycle and return the state the caller must keep.
    ///
    /// Never fails: fetch errors are counted on the returned state, enrichment
    /// errors only drop the affected detail field.
    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(user_id = %stream.user_id(), room_id = %stream.room_id())
    )]
    pub async fn run_cycle(&self, mut stream: StreamState) -> CycleResult {
        self.throttle(&stream).await;

        let fetched = self
            .api
            .list_notifications(stream.auth(), stream.participating, stream.since())
            .await;

        let outcome = match fetched {
            Ok(items) => {
                stream.advance_cursor(self.clock.now_ms());
                if self.config.reset_failures_on_success {
                    stream.failure_count = 0;
                }
                if !items.is_empty() {
                    tracing::info!(events = items.len(), "fetched notifications");
                }
                let events = self.enricher.enrich_all(stream.auth(), items).await;
                self.publish(&stream, events).await
            }
            Err(e) => {
                stream.failure_count = stream.failure_count.saturating_add(1);
                tracing::warn!(
                    error = %e,
                    failure_count = stream.failure_count,
                    "failed to fetch notifications"
                );
                CycleOutcome::FetchFailed {
                    error: e.to_string(),
                }
            }
        };

        let threshold_tripped = stream.failure_count > self.config.failure_threshold;
        let report = CycleReport {
            user_id: stream.user_id().clone(),
            outcome,
            failure_count: stream.failure_count,
            last_read_ts: stream.last_read_ts(),
            threshold_tripped,
        };
        CycleResult {
            state: stream,
            report,
        }
    }

    async fn throttle(&self, stream: &StreamState) {
        let min_ms = i64::try_from(self.config.min_interval.as_millis()).unwrap_or(i64::MAX);
        let elapsed = self.clock.now_ms().saturating_sub(stream.last_read_ts());
        if elapsed >= min_ms {
            return;
        }
        // A cursor ahead of the clock never waits longer than one interval.
        let wait_ms = min_ms.saturating_sub(elapsed).min(min_ms);
        tracing::debug!(wait_ms, "throttling poll cycle");
        tokio::time::sleep(Duration::from_millis(u64::try_from(wait_ms).unwrap_or(0))).await;
    }

    async fn publish(&self, stream: &StreamState, events: Vec<Notification>) -> CycleOutcome {
        let count = events.len();
        let batch = PublishedBatch {
            room_id: stream.room_id().clone(),
            last_read_ts: stream.last_read_ts(),
            events,
        };
        let dedupe_key = format!("{}:{}", stream.user_id(), stream.last_read_ts());

        let published = match Event::from_data(
            &self.config.event_topic,
            &self.sender.tag(),
            &batch,
            dedupe_key,
        ) {
            Ok(ev) => self.bus.publish(ev).await,
            Err(e) => Err(e),
        };

        match published {
            Ok(event_id) => CycleOutcome::Published {
                event_id,
                events: count,
            },
            Err(e) => {
                tracing::error!(error = %e, events = count, "failed to publish notification batch");
                CycleOutcome::PublishFailed {
                    error: e.to_string(),
                }
            }
        }
    }
}
