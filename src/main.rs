//! CLI for treestatus-pulse
//!
//! Subcommands:
//! - `ping`: check that the configured broker is reachable
//! - `publish`: publish a JSON payload to an exchange
//! - `notify`: announce a tree status change (honours `PULSE_TREESTATUS_ENABLE`)

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use treestatus_pulse::config::{Settings, load_config};
use treestatus_pulse::pulse::{Pulse, TreeStatusChange, TreeStatusNotifier, app_heartbeat};

#[derive(Parser)]
#[command(name = "treestatus-pulse")]
enum Command {
    /// Check that the broker is reachable
    Ping,
    /// Publish a JSON payload
    Publish {
        #[arg(long)]
        exchange: String,
        #[arg(long)]
        routing_key: String,
        /// JSON document to send as the payload
        #[arg(long)]
        payload: String,
    },
    /// Announce a tree status change
    Notify {
        #[arg(long)]
        tree: String,
        #[arg(long)]
        status: String,
        #[arg(long, default_value = "")]
        reason: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    treestatus_pulse::utils::logging::init("info");

    let cmd = Command::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let pulse = Pulse::amqp(settings.connection_config());

    let result = run(cmd, &pulse, &settings).await;
    pulse.close().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    cmd: Command,
    pulse: &Pulse,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Command::Ping => {
            app_heartbeat(pulse).await?;
            info!("Broker at {}:{} is reachable", settings.host, settings.port);
        }
        Command::Publish {
            exchange,
            routing_key,
            payload,
        } => {
            let payload: serde_json::Value = serde_json::from_str(&payload)?;
            pulse.publish(&exchange, &routing_key, &payload).await?;
        }
        Command::Notify {
            tree,
            status,
            reason,
            tags,
        } => {
            let notifier = TreeStatusNotifier::new(
                pulse.clone(),
                &settings.treestatus_exchange,
                settings.treestatus_enable,
            );
            if !notifier.is_enabled() {
                info!("PULSE_TREESTATUS_ENABLE is off, nothing to send");
            }
            let change = TreeStatusChange::new(&tree, &status)
                .with_reason(&reason)
                .with_tags(tags);
            notifier.notify(&change).await?;
        }
    }
    Ok(())
}
