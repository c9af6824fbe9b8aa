use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::AuthToken;
use crate::notifications::models::{Notification, NotificationReason, Subject, SubjectType};
use crate::notifications::traits::NotificationsApi;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub(crate) struct ListCall {
    pub participating: bool,
    pub since: Option<DateTime<Utc>>,
    pub at: tokio::time::Instant,
}

/// `NotificationsApi` fake answering from a script.
///
/// List responses are consumed in order; an exhausted script answers with an
/// empty feed. Detail URLs without an entry fail.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    lists: Mutex<VecDeque<std::result::Result<Vec<Notification>, String>>>,
    details: Mutex<HashMap<String, std::result::Result<serde_json::Value, String>>>,
    calls: Mutex<Vec<ListCall>>,
    detail_calls: Mutex<Vec<String>>,
    list_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    pub fn push_items(&self, items: Vec<Notification>) -> &Self {
        self.lists.lock().unwrap().push_back(Ok(items));
        self
    }

    pub fn push_failure(&self, message: &str) -> &Self {
        self.lists.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn detail(&self, url: &str, body: serde_json::Value) -> &Self {
        self.details.lock().unwrap().insert(url.to_string(), Ok(body));
        self
    }

    pub fn list_calls(&self) -> Vec<ListCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn detail_calls(&self) -> Vec<String> {
        self.detail_calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationsApi for ScriptedApi {
    async fn list_notifications(
        &self,
        _auth: &AuthToken,
        participating: bool,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Notification>> {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        self.calls.lock().unwrap().push(ListCall {
            participating,
            since,
            at: tokio::time::Instant::now(),
        });

        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.lists.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match next {
            None => Ok(Vec::new()),
            Some(Ok(items)) => Ok(items),
            Some(Err(message)) => Err(Error::BackendMessage(message)),
        }
    }

    async fn fetch_detail(&self, _auth: &AuthToken, url: &str) -> Result<serde_json::Value> {
        self.detail_calls.lock().unwrap().push(url.to_string());
        match self.details.lock().unwrap().get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(Error::BackendMessage(message.clone())),
            None => Err(Error::RemoteStatus {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

pub(crate) fn notification(
    id: &str,
    subject_url: Option<&str>,
    latest_comment_url: Option<&str>,
) -> Notification {
    Notification {
        id: id.to_string(),
        reason: NotificationReason::Mention,
        unread: true,
        updated_at: Utc::now(),
        last_read_at: None,
        url: format!("https://api.github.com/notifications/threads/{id}"),
        subject: Subject {
            title: format!("subject {id}"),
            url: subject_url.map(str::to_string),
            latest_comment_url: latest_comment_url.map(str::to_string),
            kind: SubjectType::Issue,
            url_data: None,
            latest_comment_url_data: None,
        },
        extra: serde_json::Map::new(),
    }
}
