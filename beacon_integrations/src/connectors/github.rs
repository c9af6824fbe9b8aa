//! GitHub notifications connector.
//!
//! Lists `GET /notifications` for the authenticated user and fetches subject /
//! comment detail from the API URLs embedded in each notification.

use std::time::Duration;

use async_trait::async_trait;
use beacon_core::notifications::models::format_since;
use beacon_core::{AuthToken, Error, Notification, NotificationsApi, Result};
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::instrument;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub api_base: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: "beacon".to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

impl GithubConfig {
    /// Defaults overridden by `BEACON_GITHUB_API_BASE` / `BEACON_GITHUB_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("BEACON_GITHUB_API_BASE") {
            if !v.trim().is_empty() {
                cfg.api_base = v;
            }
        }
        if let Ok(v) = std::env::var("BEACON_GITHUB_TIMEOUT_MS") {
            if !v.trim().is_empty() {
                let ms: u64 = v.trim().parse().map_err(|_| {
                    Error::InvalidInput(format!("invalid BEACON_GITHUB_TIMEOUT_MS: {v}"))
                })?;
                cfg.timeout = Duration::from_millis(ms);
            }
        }
        Ok(cfg)
    }
}

#[derive(Clone)]
pub struct GithubNotificationsClient {
    client: Client,
    api_base: String,
    user_agent: HeaderValue,
}

impl GithubNotificationsClient {
    pub fn new(cfg: GithubConfig) -> Result<Self> {
        let api_base = cfg.api_base.trim_end_matches('/').to_string();
        if api_base.is_empty() {
            return Err(Error::InvalidInput("github api_base is empty".to_string()));
        }
        let user_agent = HeaderValue::from_str(&cfg.user_agent)
            .map_err(|e| Error::backend("invalid github user agent", e))?;
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(Error::backend_reqwest)?;

        Ok(Self {
            client,
            api_base,
            user_agent,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn headers(&self, auth: &AuthToken) -> Result<HeaderMap> {
        let mut h = HeaderMap::new();
        h.insert(USER_AGENT, self.user_agent.clone());
        h.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        let mut value = HeaderValue::from_str(&format!("Bearer {}", auth.expose()))
            .map_err(|e| Error::backend("invalid github auth header", e))?;
        value.set_sensitive(true);
        h.insert(AUTHORIZATION, value);
        Ok(h)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        auth: &AuthToken,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .headers(self.headers(auth)?)
            .query(query)
            .send()
            .await
            .map_err(Error::backend_reqwest)?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Unauthorized(format!(
                "github returned {} for {url}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(Error::RemoteStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        resp.json::<T>().await.map_err(Error::backend_reqwest)
    }
}

#[async_trait]
impl NotificationsApi for GithubNotificationsClient {
    #[instrument(level = "debug", skip(self, auth))]
    async fn list_notifications(
        &self,
        auth: &AuthToken,
        participating: bool,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Notification>> {
        let url = format!("{}/notifications", self.api_base);
        let mut query = vec![("participating", participating.to_string())];
        if let Some(since) = since {
            query.push(("since", format_since(since)));
        }
        self.get_json(auth, &url, &query).await
    }

    #[instrument(level = "debug", skip(self, auth))]
    async fn fetch_detail(&self, auth: &AuthToken, url: &str) -> Result<Value> {
        // The token is only ever sent to the configured API host.
        if !url.starts_with(&format!("{}/", self.api_base)) {
            return Err(Error::InvalidInput(format!(
                "refusing to fetch detail outside {}: {url}",
                self.api_base
            )));
        }
        self.get_json(auth, url, &[]).await
    }
}
