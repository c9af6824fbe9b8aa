use std::sync::Arc;

use beacon_core::events::console::ConsoleEventBus;
use beacon_core::{PollerConfig, SystemClock};
use beacon_integrations::connectors::github::{GithubConfig, GithubNotificationsClient};
use beacon_server::cli::{Cli, Commands};
use beacon_server::registrations::load_registrations;
use beacon_server::runtime::{build_scheduler, millis, run_until};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    beacon_core::o11y::init_global_from_env()?;
    let cli = Cli::parse();

    match cli.command_or_default() {
        Commands::Run {
            registrations,
            stdin_events,
        } => {
            let poller = PollerConfig::from_env()?;
            let github = GithubConfig::from_env()?;
            let regs = match registrations.as_deref() {
                Some(path) => load_registrations(path).await?,
                None => Vec::new(),
            };
            if regs.is_empty() && !stdin_events {
                tracing::warn!("no registrations and stdin events disabled; nothing will be polled");
            }

            let api = Arc::new(GithubNotificationsClient::new(github)?);
            let scheduler = build_scheduler(
                api,
                Arc::new(ConsoleEventBus::stdout()),
                Arc::new(SystemClock),
                poller,
            )?;
            run_until(scheduler, regs, stdin_events, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for ctrl-c");
                }
            })
            .await?;
        }
        Commands::CheckRegistrations { path } => {
            let regs = load_registrations(&path).await?;
            for reg in &regs {
                println!(
                    "{} -> {} (since {}, participating {})",
                    reg.user_id, reg.room_id, reg.since, reg.filter_participating
                );
            }
            println!("ok: {} registrations", regs.len());
        }
        Commands::Config => {
            let poller = PollerConfig::from_env()?;
            poller.validate()?;
            let github = GithubConfig::from_env()?;
            let cfg = serde_json::json!({
                "poller": {
                    "min_interval_ms": millis(poller.min_interval),
                    "poll_interval_ms": millis(poller.poll_interval),
                    "failure_threshold": poller.failure_threshold,
                    "enrich_concurrency": poller.enrich_concurrency,
                    "reset_failures_on_success": poller.reset_failures_on_success,
                    "event_topic": poller.event_topic,
                    "sender": poller.sender,
                },
                "github": {
                    "api_base": github.api_base,
                    "user_agent": github.user_agent,
                    "timeout_ms": millis(github.timeout),
                },
            });
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
    }

    Ok(())
}
