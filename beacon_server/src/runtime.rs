//! Wiring of the poller and the run loop behind `beacon run`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use beacon_core::events::traits::EventBus;
use beacon_core::notifications::BusNoticeSender;
use beacon_core::{
    Clock, NotificationsApi, PollCycleExecutor, PollerConfig, SenderIdentity, StreamRegistration,
    StreamScheduler,
};
use tokio::io::BufReader;

use crate::registrations::pump_events;

/// Notices go onto the same bus as the batches, under the poller's sender tag.
pub fn build_scheduler(
    api: Arc<dyn NotificationsApi>,
    bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    config: PollerConfig,
) -> anyhow::Result<StreamScheduler> {
    let notices = Arc::new(BusNoticeSender::new(
        bus.clone(),
        SenderIdentity::system(config.sender.clone()),
    ));
    let executor = PollCycleExecutor::new(api, bus, clock, config)?;
    Ok(StreamScheduler::new(executor, notices))
}

/// Register every stream, optionally follow stdin events, and poll until
/// `shutdown` resolves.
#[tracing::instrument(level = "info", skip_all, fields(streams = registrations.len()))]
pub async fn run_until<F>(
    scheduler: StreamScheduler,
    registrations: Vec<StreamRegistration>,
    stdin_events: bool,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    for reg in registrations {
        scheduler.add_user(reg)?;
    }
    tracing::info!(streams = scheduler.len(), "beacon running");

    let pump = stdin_events.then(|| {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            match pump_events(&scheduler, BufReader::new(tokio::io::stdin())).await {
                Ok(applied) => tracing::info!(applied, "stdin closed; no more registration events"),
                Err(e) => tracing::warn!(error = %e, "registration event stream failed"),
            }
        })
    });

    shutdown.await;
    tracing::info!("shutting down");
    if let Some(pump) = pump {
        pump.abort();
    }
    scheduler.shutdown().await;
    Ok(())
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
