use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AuthToken, RoomId, UserId};
use crate::{Error, Result};

/// Why the user received a notification.
///
/// Values the feed adds later land in `Other` and serialize back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationReason {
    Assign,
    Author,
    Comment,
    Invitation,
    Manual,
    Mention,
    #[serde(alias = "review_requested")]
    ReviewRequired,
    SecurityAlert,
    StateChange,
    Subscribed,
    TeamMention,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectType {
    PullRequest,
    Issue,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub latest_comment_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: SubjectType,

    /// Body of `GET url`, attached by the enricher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_data: Option<serde_json::Value>,
    /// Body of `GET latest_comment_url`, attached by the enricher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_comment_url_data: Option<serde_json::Value>,
}

/// One item of the remote notification feed.
///
/// Fields the bridge does not model (e.g. `repository`) are carried through
/// untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub reason: NotificationReason,
    pub unread: bool,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_read_at: Option<DateTime<Utc>>,
    pub url: String,
    pub subject: Subject,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Inbound request to start polling for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRegistration {
    pub user_id: UserId,
    pub room_id: RoomId,
    /// Initial cursor in ms since the epoch; 0 polls without a `since` filter.
    #[serde(default)]
    pub since: i64,
    #[serde(default)]
    pub filter_participating: bool,
    pub token: AuthToken,
}

impl StreamRegistration {
    pub fn validate(&self) -> Result<()> {
        if self.user_id.0.trim().is_empty() {
            return Err(Error::InvalidInput("registration user_id is empty".to_string()));
        }
        if self.room_id.0.trim().is_empty() {
            return Err(Error::InvalidInput("registration room_id is empty".to_string()));
        }
        if self.token.expose().trim().is_empty() {
            return Err(Error::InvalidInput("registration token is empty".to_string()));
        }
        if self.since < 0 {
            return Err(Error::InvalidInput(format!(
                "registration since must be >= 0, got {}",
                self.since
            )));
        }
        Ok(())
    }
}

/// Enable/disable requests produced by the registration collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistrationEvent {
    Enable(StreamRegistration),
    Disable { user_id: UserId },
}

/// Per-user polling state.
///
/// Identity, room and credential are fixed at registration; only the cycle
/// that currently owns the state changes the cursor and failure count.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamState {
    user_id: UserId,
    room_id: RoomId,
    auth: AuthToken,
    last_read_ts: i64,
    pub participating: bool,
    pub failure_count: u32,
}

impl StreamState {
    pub fn new(user_id: UserId, room_id: RoomId, auth: AuthToken) -> Self {
        Self {
            user_id,
            room_id,
            auth,
            last_read_ts: 0,
            participating: false,
            failure_count: 0,
        }
    }

    pub fn from_registration(reg: StreamRegistration) -> Self {
        Self {
            user_id: reg.user_id,
            room_id: reg.room_id,
            auth: reg.token,
            last_read_ts: reg.since.max(0),
            participating: reg.filter_participating,
            failure_count: 0,
        }
    }

    pub fn with_last_read_ts(mut self, ts: i64) -> Self {
        self.last_read_ts = ts.max(0);
        self
    }

    pub fn with_participating(mut self, participating: bool) -> Self {
        self.participating = participating;
        self
    }

    pub fn with_failure_count(mut self, failure_count: u32) -> Self {
        self.failure_count = failure_count;
        self
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn auth(&self) -> &AuthToken {
        &self.auth
    }

    pub fn last_read_ts(&self) -> i64 {
        self.last_read_ts
    }

    /// Move the cursor forward; never backwards.
    pub fn advance_cursor(&mut self, ts: i64) {
        self.last_read_ts = self.last_read_ts.max(ts);
    }

    /// `since` filter for the next fetch; `None` until the stream has a cursor.
    pub fn since(&self) -> Option<DateTime<Utc>> {
        if self.last_read_ts == 0 {
            return None;
        }
        DateTime::<Utc>::from_timestamp_millis(self.last_read_ts)
    }
}

/// Render a cursor the way the remote API expects it (`2024-01-02T03:04:05.678Z`).
pub fn format_since(since: DateTime<Utc>) -> String {
    since.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Payload of one `notifications.user.events` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedBatch {
    pub room_id: RoomId,
    pub last_read_ts: i64,
    pub events: Vec<Notification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "id": "1",
            "reason": "review_requested",
            "unread": true,
            "updated_at": "2024-05-01T10:00:00Z",
            "last_read_at": null,
            "url": "https://api.github.com/notifications/threads/1",
            "subject": {
                "title": "Fix the thing",
                "url": "https://api.github.com/repos/o/r/pulls/7",
                "latest_comment_url": null,
                "type": "PullRequest"
            },
            "repository": { "full_name": "o/r" }
        })
    }

    #[test]
    fn notification_keeps_unmodelled_fields() {
        let n: Notification = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(n.reason, NotificationReason::ReviewRequired);
        assert_eq!(n.subject.kind, SubjectType::PullRequest);
        assert_eq!(n.extra["repository"]["full_name"], "o/r");

        let out = serde_json::to_value(&n).unwrap();
        assert_eq!(out["repository"]["full_name"], "o/r");
        assert_eq!(out["reason"], "review_required");
        assert!(out["subject"].get("url_data").is_none());
    }

    #[test]
    fn unknown_reason_and_subject_type_round_trip() {
        let mut v = sample_json();
        v["reason"] = serde_json::json!("ci_activity");
        v["subject"]["type"] = serde_json::json!("CheckSuite");

        let n: Notification = serde_json::from_value(v).unwrap();
        assert_eq!(n.reason, NotificationReason::Other("ci_activity".to_string()));
        assert_eq!(n.subject.kind, SubjectType::Other("CheckSuite".to_string()));

        let out = serde_json::to_value(&n).unwrap();
        assert_eq!(out["reason"], "ci_activity");
        assert_eq!(out["subject"]["type"], "CheckSuite");
    }

    #[test]
    fn since_is_none_until_first_cursor() {
        let state = StreamState::new("u".into(), "!r".into(), AuthToken::new("t"));
        assert_eq!(state.since(), None);

        let state = state.with_last_read_ts(1_714_557_600_123);
        let since = state.since().unwrap();
        assert_eq!(format_since(since), "2024-05-01T10:00:00.123Z");
    }

    #[test]
    fn cursor_never_moves_backwards() {
        let mut state =
            StreamState::new("u".into(), "!r".into(), AuthToken::new("t")).with_last_read_ts(500);
        state.advance_cursor(400);
        assert_eq!(state.last_read_ts(), 500);
        state.advance_cursor(900);
        assert_eq!(state.last_read_ts(), 900);
    }

    #[test]
    fn registration_event_wire_shape() {
        let ev: RegistrationEvent = serde_json::from_value(serde_json::json!({
            "kind": "enable",
            "user_id": "@alice:example.org",
            "room_id": "!room:example.org",
            "since": 0,
            "filter_participating": true,
            "token": "ghp_x"
        }))
        .unwrap();
        let RegistrationEvent::Enable(reg) = ev else {
            panic!("expected enable");
        };
        assert!(reg.filter_participating);
        assert!(reg.validate().is_ok());

        let state = StreamState::from_registration(reg);
        assert_eq!(state.failure_count, 0);
        assert!(state.participating);

        let ev: RegistrationEvent = serde_json::from_value(serde_json::json!({
            "kind": "disable",
            "user_id": "@alice:example.org"
        }))
        .unwrap();
        assert_eq!(
            ev,
            RegistrationEvent::Disable {
                user_id: UserId::from("@alice:example.org")
            }
        );
    }

    #[test]
    fn registration_validation() {
        let reg = StreamRegistration {
            user_id: "u".into(),
            room_id: "!r".into(),
            since: -1,
            filter_participating: false,
            token: AuthToken::new("t"),
        };
        assert!(reg.validate().is_err());

        let reg = StreamRegistration {
            since: 0,
            token: AuthToken::new(" "),
            ..reg
        };
        assert!(reg.validate().is_err());
    }

    #[test]
    fn batch_uses_camel_case_keys() {
        let batch = PublishedBatch {
            room_id: "!r".into(),
            last_read_ts: 42,
            events: vec![],
        };
        let v = serde_json::to_value(&batch).unwrap();
        assert_eq!(v, serde_json::json!({"roomId": "!r", "lastReadTs": 42, "events": []}));
    }
}
