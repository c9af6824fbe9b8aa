//! Stream registrations from a file, and enable/disable events from a line stream.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use beacon_core::{RegistrationEvent, StreamRegistration, StreamScheduler};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Parse a JSON array of registrations, rejecting invalid or duplicate users.
pub fn parse_registrations(raw: &str) -> anyhow::Result<Vec<StreamRegistration>> {
    let regs: Vec<StreamRegistration> =
        serde_json::from_str(raw).context("registrations must be a JSON array")?;

    let mut seen = BTreeSet::new();
    for (idx, reg) in regs.iter().enumerate() {
        reg.validate()
            .with_context(|| format!("registration #{idx}"))?;
        if !seen.insert(reg.user_id.clone()) {
            anyhow::bail!("duplicate registration for user {}", reg.user_id);
        }
    }
    Ok(regs)
}

pub async fn load_registrations(path: &Path) -> anyhow::Result<Vec<StreamRegistration>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    parse_registrations(&raw).with_context(|| format!("parse {}", path.display()))
}

/// Apply one `RegistrationEvent` per non-blank line until the reader closes.
///
/// Malformed or rejected lines are logged and skipped. Returns how many events
/// were applied.
pub async fn pump_events<R>(scheduler: &StreamScheduler, reader: R) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut applied = 0usize;
    while let Some(line) = lines.next_line().await.context("read registration event")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = match serde_json::from_str::<RegistrationEvent>(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "malformed registration event");
                continue;
            }
        };
        match scheduler.handle_event(event) {
            Ok(()) => applied += 1,
            Err(e) => tracing::warn!(error = %e, "registration event rejected"),
        }
    }
    Ok(applied)
}
