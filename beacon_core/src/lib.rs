//! Beacon core: polls a per-user notification feed, enriches each item and
//! republishes the batch onto the event bus.

pub mod error;
pub mod events;
pub mod models;
pub mod notifications;
pub mod o11y;

pub use error::{Error, Result};
pub use models::{AuthToken, RoomId, SenderIdentity, UserId};
pub use notifications::{
    Clock, CycleOutcome, CycleReport, NoticeSender, Notification, NotificationReason,
    NotificationsApi, PollCycleExecutor, PollerConfig, PublishedBatch, RegistrationEvent,
    StreamRegistration, StreamScheduler, StreamState, Subject, SubjectType, SystemClock,
    TokioClock,
};
