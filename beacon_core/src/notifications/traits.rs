use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Result;
use crate::models::{AuthToken, RoomId};
use crate::notifications::models::Notification;

/// Authenticated access to the remote notification feed.
///
/// Implementations live in `beacon_integrations` or embedding code.
#[async_trait]
pub trait NotificationsApi: Send + Sync {
    /// `GET /notifications?participating=<bool>[&since=<ISO8601>]`.
    async fn list_notifications(
        &self,
        auth: &AuthToken,
        participating: bool,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Notification>>;

    /// `GET <url>` for subject / latest-comment detail.
    async fn fetch_detail(&self, auth: &AuthToken, url: &str) -> Result<serde_json::Value>;
}

/// Delivers plain-text notices to a room.
#[async_trait]
pub trait NoticeSender: Send + Sync {
    async fn send_notice(&self, room_id: &RoomId, body: &str) -> Result<()>;
}
