//! Per-user notification streams: state, enrichment, poll cycles and scheduling.
//!
//! The scheduler owns one background task per registered user. Each task runs
//! poll cycles strictly one after another and installs the returned state before
//! the next cycle begins.

pub mod clock;
pub mod config;
pub mod cycle;
pub mod enrich;
pub mod models;
pub mod notice;
pub mod scheduler;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use clock::{Clock, SystemClock, TokioClock};
pub use config::{FAILURE_THRESHOLD, MIN_INTERVAL_MS, NOTIFICATIONS_EVENT_TOPIC, PollerConfig};
pub use cycle::{CycleOutcome, CycleReport, CycleResult, PollCycleExecutor};
pub use enrich::NotificationEnricher;
pub use models::{
    Notification, NotificationReason, PublishedBatch, RegistrationEvent, StreamRegistration,
    StreamState, Subject, SubjectType,
};
pub use notice::{BusNoticeSender, DISABLED_NOTICE, MemoryNoticeSender, NOTICE_TOPIC};
pub use scheduler::StreamScheduler;
pub use traits::{NoticeSender, NotificationsApi};
