mod cli;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use live_notify::check::{CheckReport, run_checks};
use live_notify::config::AppConfig;
use live_notify::logging::init_logging;
use live_notify::monitor::{PlatformClient, PollCycle, PollCycleConfig};
use live_notify::notification::NotificationDispatcher;
use live_notify::scheduler::{Scheduler, SchedulerConfig, shutdown_signal};
use live_notify::state::StateStore;
use platforms_helix::HelixClient;

use crate::cli::{Args, Commands};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let code = match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            exit_code(&e)
        }
    };

    process::exit(code);
}

/// Map an error to the process exit code of its kind.
fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<live_notify::Error>()
        .map(|e| e.kind().exit_code())
        .unwrap_or(1)
}

async fn run(args: Args) -> anyhow::Result<i32> {
    let _log_guard = init_logging(&args.log_level, args.log_file.as_deref())?;

    let config = AppConfig::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        streamers = config.streamers.len(),
        "live-notify starting"
    );

    let platform: Arc<dyn PlatformClient> = Arc::new(
        HelixClient::new(config.helix_config())
            .map_err(live_notify::Error::from)
            .context("Failed to create Twitch client")?,
    );

    match args.command() {
        Commands::Check { send_test } => {
            let dispatcher = if send_test {
                Some(NotificationDispatcher::ntfy(
                    config.ntfy.clone(),
                    &config.time_format,
                )?)
            } else {
                None
            };
            let report =
                run_checks(platform.as_ref(), &config.streamers, dispatcher.as_ref()).await;
            print_check_report(&config, &report);
            Ok(if report.passed() { 0 } else { 1 })
        }
        Commands::Run { once } => {
            let dispatcher =
                NotificationDispatcher::ntfy(config.ntfy.clone(), &config.time_format)?;
            let store = StateStore::open(&config.state_file);
            let cycle = PollCycle::new(
                PollCycleConfig {
                    channels: config.streamers.clone(),
                    template: config.message_template.clone(),
                    retention: config.state_retention(),
                },
                platform,
                dispatcher,
                store,
            );

            if once {
                let mut cycle = cycle;
                let report = cycle.run_cycle().await?;
                info!(
                    checked = report.checked,
                    notified = report.notified,
                    platform_error = ?report.platform_error,
                    "Single cycle finished"
                );
                return Ok(0);
            }

            let mut scheduler = Scheduler::new(
                cycle,
                SchedulerConfig {
                    poll_interval: config.poll_interval(),
                    backoff: config.backoff_policy(),
                },
            );

            let token = CancellationToken::new();
            tokio::spawn({
                let token = token.clone();
                async move {
                    shutdown_signal().await;
                    token.cancel();
                }
            });

            scheduler.run(token).await?;
            info!("live-notify stopped");
            Ok(0)
        }
    }
}

fn print_check_report(config: &AppConfig, report: &CheckReport) {
    println!("✅ Configuration is valid");
    println!("   ntfy topic: {}", config.ntfy.topic);
    println!("   state file: {}", config.state_file.display());

    match &report.platform_error {
        None => println!("✅ Twitch API credentials work"),
        Some(e) => println!("❌ Twitch API check failed: {}", e),
    }
    for (name, id) in &report.found {
        println!("✅ {} (id {})", name, id);
    }
    for name in &report.missing {
        println!("❌ {} not found", name);
    }
    match &report.notification {
        Some(Ok(())) => println!("✅ Test notification sent"),
        Some(Err(e)) => println!("❌ Test notification failed: {}", e),
        None => {}
    }

    if report.passed() {
        println!("\nAll checks passed.");
    } else {
        println!("\nSome checks failed.");
    }
}
