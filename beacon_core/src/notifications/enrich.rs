use std::sync::Arc;

use futures_util::StreamExt;

use crate::models::AuthToken;
use crate::notifications::models::Notification;
use crate::notifications::traits::NotificationsApi;

/// Attaches subject and latest-comment detail to notifications.
///
/// A failed detail fetch only leaves its own field unset; the notification is
/// always returned.
#[derive(Clone)]
pub struct NotificationEnricher {
    api: Arc<dyn NotificationsApi>,
    concurrency: usize,
}

impl NotificationEnricher {
    pub fn new(api: Arc<dyn NotificationsApi>, concurrency: usize) -> Self {
        Self {
            api,
            concurrency: concurrency.max(1),
        }
    }

    /// Enrich a batch, preserving input order.
    #[tracing::instrument(level = "debug", skip_all, fields(items = items.len()))]
    pub async fn enrich_all(&self, auth: &AuthToken, items: Vec<Notification>) -> Vec<Notification> {
        futures_util::stream::iter(items)
            .map(|item| self.enrich(auth, item))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    pub async fn enrich(&self, auth: &AuthToken, mut item: Notification) -> Notification {
        let subject_url = item.subject.url.clone();
        let comment_url = item.subject.latest_comment_url.clone();

        let (url_data, comment_data) = tokio::join!(
            self.fetch(auth, &item.id, "subject.url", subject_url.as_deref()),
            self.fetch(auth, &item.id, "subject.latest_comment_url", comment_url.as_deref()),
        );

        if url_data.is_some() {
            item.subject.url_data = url_data;
        }
        if comment_data.is_some() {
            item.subject.latest_comment_url_data = comment_data;
        }
        item
    }

    async fn fetch(
        &self,
        auth: &AuthToken,
        notification_id: &str,
        field: &'static str,
        url: Option<&str>,
    ) -> Option<serde_json::Value> {
        let url = url.filter(|u| !u.trim().is_empty())?;
        match self.api.fetch_detail(auth, url).await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!(
                    notification_id,
                    field,
                    url,
                    error = %e,
                    "failed to enrich notification; publishing without detail"
                );
                None
            }
        }
    }
}
