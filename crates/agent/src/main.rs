//! `nuki-otp-agent` -- one-time keypad code manager for a Nuki smartlock.
//!
//! Exposes the code toggle, readout and verification as subcommands and
//! runs the periodic housekeeping loop in `run` mode.
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default                | Description                       |
//! |----------------------------|----------|------------------------|-----------------------------------|
//! | `NUKI_API_TOKEN`           | yes      | --                     | Nuki Web API bearer token         |
//! | `NUKI_LOCK_NAME`           | yes      | --                     | Name of the smartlock to manage   |
//! | `NUKI_API_URL`             | no       | `https://api.nuki.io`  | API base URL                      |
//! | `NUKI_OTP_PREFIX`          | no       | `OTP`                  | Name prefix marking our codes     |
//! | `NUKI_OTP_LIFETIME_HOURS`  | no       | `12`                   | Code lifetime, 1 to 168 hours     |
//! | `NUKI_OTP_INTERVAL_SECS`   | no       | `300`                  | Refresh interval in `run` mode    |

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use nuki_otp_agent::poller::CodePoller;
use nuki_otp_client::{validate_setup, OtpService, RetryPolicy};
use nuki_otp_core::OtpConfig;
use nuki_otp_events::{EventBus, RefreshListener};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "nuki-otp-agent", version, about = "Manage one-time keypad codes on a Nuki smartlock")]
struct Cli {
    /// Override the configured lock name.
    #[arg(long, global = true)]
    lock_name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Refresh periodically and react to toggle changes until Ctrl-C.
    Run {
        #[arg(long, default_value_t = 300, env = "NUKI_OTP_INTERVAL_SECS")]
        interval_secs: u64,

        /// Issue a fresh code once the loop is running.
        #[arg(long)]
        turn_on: bool,
    },
    /// Replace all codes with one fresh code.
    On,
    /// Delete all codes.
    Off,
    /// Clean up, then print the current readout as JSON.
    Status,
    /// Check whether a code is currently valid.
    Verify { code: u32 },
    /// Validate the configuration against the live API.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "nuki_otp_agent=info,nuki_otp_client=info,nuki_otp_events=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = OtpConfig::from_env().context("Invalid configuration")?;
    if let Some(name) = cli.lock_name {
        config.lock_name = name;
    }

    tracing::info!(
        lock = %config.lock_name,
        prefix = %config.code_prefix,
        lifetime_hours = config.lifetime_hours,
        "Starting nuki-otp-agent",
    );

    match cli.command {
        Command::Check => check(config).await,
        Command::Run {
            interval_secs,
            turn_on,
        } => run(build_service(config)?, Duration::from_secs(interval_secs), turn_on).await,
        Command::On => {
            let issued = build_service(config)?.turn_on().await?;
            println!("{} (valid until {})", issued.code, issued.ends_at().to_rfc3339());
            Ok(())
        }
        Command::Off => {
            build_service(config)?.turn_off().await?;
            println!("off");
            Ok(())
        }
        Command::Status => {
            let readout = build_service(config)?.readout().await?;
            println!("{}", serde_json::to_string_pretty(&readout)?);
            Ok(())
        }
        Command::Verify { code } => {
            let valid = build_service(config)?.verify_code(code).await?;
            println!("{}", if valid { "valid" } else { "invalid" });
            Ok(())
        }
    }
}

fn build_service(config: OtpConfig) -> anyhow::Result<OtpService> {
    Ok(OtpService::new(config, Arc::new(EventBus::default()))?)
}

/// Validate the configuration against the live API and print its identity.
async fn check(config: OtpConfig) -> anyhow::Result<()> {
    let info = validate_setup(config, RetryPolicy::default())
        .await
        .map_err(|e| anyhow::anyhow!("{} ({})", e, e.key()))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "title": info.title,
            "smartlock_id": info.smartlock_id,
            "unique_id": info.unique_id,
        }))?
    );
    Ok(())
}

/// Poll on a fixed interval and refresh after every toggle change until
/// Ctrl-C.
async fn run(service: OtpService, interval: Duration, turn_on: bool) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let poller = CodePoller::new(service.clone(), interval);

    let poll_task = {
        let poller = poller.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { poller.run(cancel).await })
    };

    let listener_task = {
        let receiver = service.bus().subscribe();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            RefreshListener::default()
                .run(receiver, cancel, move |_| {
                    let poller = poller.clone();
                    async move {
                        poller.poll_once().await;
                    }
                })
                .await;
        })
    };

    tracing::info!(interval_secs = interval.as_secs(), "Agent running");

    if turn_on {
        match service.turn_on().await {
            Ok(issued) => tracing::info!(ends_at = %issued.ends_at(), "Issued startup code"),
            Err(e) => tracing::error!(error = %e, "Failed to issue startup code"),
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown requested");
    cancel.cancel();

    poll_task.await.context("Poller task panicked")?;
    listener_task.await.context("Refresh listener task panicked")?;
    Ok(())
}
