use std::time::Duration;

use crate::{Error, Result};

/// Minimum spacing between two remote fetches of the same stream.
pub const MIN_INTERVAL_MS: u64 = 15_000;
/// A stream is disabled once its consecutive failures exceed this.
pub const FAILURE_THRESHOLD: u32 = 50;
pub const NOTIFICATIONS_EVENT_TOPIC: &str = "notifications.user.events";
pub const DEFAULT_SENDER: &str = "notifications:github";

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub min_interval: Duration,
    pub failure_threshold: u32,

    /// Recurrence of each stream's trigger. The per-cycle throttle gates it further.
    pub poll_interval: Duration,

    /// Max in-flight detail fetches per cycle.
    pub enrich_concurrency: usize,

    /// When false (default) a successful fetch leaves `failure_count` untouched.
    pub reset_failures_on_success: bool,

    pub event_topic: String,
    pub sender: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(MIN_INTERVAL_MS),
            failure_threshold: FAILURE_THRESHOLD,
            poll_interval: Duration::from_millis(MIN_INTERVAL_MS),
            enrich_concurrency: 4,
            reset_failures_on_success: false,
            event_topic: NOTIFICATIONS_EVENT_TOPIC.to_string(),
            sender: DEFAULT_SENDER.to_string(),
        }
    }
}

impl PollerConfig {
    /// Defaults overridden by `BEACON_*` environment variables.
    #[tracing::instrument(level = "debug")]
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(v) = env_u64("BEACON_MIN_INTERVAL_MS")? {
            cfg.min_interval = Duration::from_millis(v);
        }
        if let Some(v) = env_u64("BEACON_POLL_INTERVAL_MS")? {
            cfg.poll_interval = Duration::from_millis(v);
        }
        if let Some(v) = env_u64("BEACON_FAILURE_THRESHOLD")? {
            cfg.failure_threshold = u32::try_from(v).map_err(|_| {
                Error::InvalidInput(format!("BEACON_FAILURE_THRESHOLD out of range: {v}"))
            })?;
        }
        if let Some(v) = env_u64("BEACON_ENRICH_CONCURRENCY")? {
            cfg.enrich_concurrency = v as usize;
        }
        if let Some(v) = env_nonempty("BEACON_RESET_FAILURES_ON_SUCCESS") {
            cfg.reset_failures_on_success = parse_bool(&v);
        }
        if let Some(v) = env_nonempty("BEACON_EVENT_TOPIC") {
            cfg.event_topic = v;
        }
        if let Some(v) = env_nonempty("BEACON_SENDER") {
            cfg.sender = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidInput("poll_interval must be > 0".to_string()));
        }
        if self.enrich_concurrency == 0 {
            return Err(Error::InvalidInput(
                "enrich_concurrency must be > 0".to_string(),
            ));
        }
        if self.event_topic.trim().is_empty() {
            return Err(Error::InvalidInput("event_topic is empty".to_string()));
        }
        if self.sender.trim().is_empty() {
            return Err(Error::InvalidInput("sender is empty".to_string()));
        }
        Ok(())
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match env_nonempty(key) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Error::InvalidInput(format!("{key} must be an unsigned integer: {v}"))),
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let cfg = PollerConfig::default();
        assert_eq!(cfg.min_interval, Duration::from_millis(15_000));
        assert_eq!(cfg.failure_threshold, 50);
        assert_eq!(cfg.event_topic, "notifications.user.events");
        assert!(!cfg.reset_failures_on_success);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_poll_interval_and_concurrency() {
        let cfg = PollerConfig {
            poll_interval: Duration::ZERO,
            ..PollerConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = PollerConfig {
            enrich_concurrency: 0,
            ..PollerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_min_interval_is_allowed() {
        let cfg = PollerConfig {
            min_interval: Duration::ZERO,
            ..PollerConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool(" on "));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("nope"));
    }
}
