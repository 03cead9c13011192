//! # relayseqd: relay sequence daemon
//!
//! Composition root that wires the relay device, the rule file and the poll
//! controller together and runs the tick loop.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the tracing subscriber
//! - Build the relay device (Modbus/TCP or virtual) and the JSON rule store
//! - Restore the rule set and tick the controller at the poll interval
//! - Handle graceful shutdown (SIGTERM/SIGINT): end states, all outputs
//!   off, disconnect, optionally save the rules
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use anyhow::Context;
use relayseq_adapter_modbus_tcp::ModbusRelay;
use relayseq_adapter_storage_json::JsonRuleStore;
use relayseq_adapter_virtual::{InputScript, VirtualRelay};
use relayseq_app::controller::SequenceController;
use relayseq_app::ports::RelayDevice;
use relayseq_app::services::rule_service::RuleService;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use config::{Config, DeviceKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        device = ?config.device.kind,
        poll_ms = config.poll.interval_ms,
        rules = %config.rules.path.display(),
        "relayseqd starting"
    );

    match config.device.kind {
        DeviceKind::Modbus => {
            let relay = ModbusRelay::new(config.relay.clone());
            run(relay, &config).await
        }
        DeviceKind::Virtual => {
            let relay = VirtualRelay::new();
            let script = InputScript::new(config.device.demo_inputs.clone(), config.demo_period());
            let demo = (!script.is_empty()).then(|| script.spawn(relay.clone()));
            let result = run(relay, &config).await;
            if let Some(demo) = demo {
                demo.abort();
            }
            result
        }
    }
}

async fn run<D: RelayDevice>(device: D, config: &Config) -> anyhow::Result<()> {
    let rules = RuleService::new(JsonRuleStore::new(&config.rules.path));
    let mut controller = SequenceController::new(device);

    if let Err(err) = controller.connect().await {
        tracing::warn!(error = %err, "relay unreachable, retrying on every tick");
    }
    let restored = rules
        .restore(&mut controller)
        .await
        .context("failed to load rules")?;
    if restored == 0 {
        tracing::warn!("no rules configured, outputs will not change");
    }

    let mut interval = tokio::time::interval(config.poll_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut offline = false;
    loop {
        tokio::select! {
            now = interval.tick() => {
                let report = controller.tick(now.into_std()).await;
                if report.skipped != offline {
                    offline = report.skipped;
                    if !offline {
                        tracing::info!("relay reachable again");
                    }
                }
            }
            () = &mut shutdown => break,
        }
    }

    tracing::info!("shutting down");
    if config.rules.save_on_exit
        && let Err(err) = rules.persist(&controller).await
    {
        tracing::error!(error = %err, "failed to save rules");
    }
    if let Err(err) = controller.shutdown().await {
        tracing::error!(error = %err, "failed to switch outputs off");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
