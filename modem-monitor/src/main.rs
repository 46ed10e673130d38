//! USB Modem Monitor
//!
//! Tracks USB modems matching the configured vendor/product IDs, logs
//! their lifecycle, and periodically prints the modems that are ready.

mod cli;
mod report;
mod settings;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use modem_watch::{handler, Manager};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Args;
use settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "modemwatch=info,modem_watch=info,modem_at=info,modem_hotplug=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let settings_path = args.config.clone().or_else(Settings::default_path);
    let mut settings = settings_path
        .as_deref()
        .map(Settings::load_from)
        .unwrap_or_default();
    args.apply(&mut settings);

    if args.save {
        let path = settings_path.context("could not determine settings path")?;
        settings.save_to(&path)?;
        info!("Saved settings to {}", path.display());
    }

    info!("Starting modem monitor");

    let manager = Arc::new(Manager::with_config(settings.monitor_config()));
    for filter in &settings.filters {
        manager.add_filter(filter.vendor_id.clone(), filter.product_id.clone());
    }
    if settings.filters.is_empty() {
        warn!("No filters configured; no modem will be tracked");
    }

    manager.register_handlers(
        Some(handler(|modem| {
            info!(
                "Modem added: id={} port={} interface={}",
                modem.hardware_id.as_deref().unwrap_or("?"),
                modem.serial_port.as_deref().unwrap_or("?"),
                modem.network_interface.as_deref().unwrap_or("?"),
            )
        })),
        Some(handler(|modem| {
            info!(
                "Modem updated: id={} port={}",
                modem.hardware_id.as_deref().unwrap_or("?"),
                modem.serial_port.as_deref().unwrap_or("?"),
            )
        })),
        Some(handler(|modem| {
            info!(
                "Modem removed: id={} interface={}",
                modem.hardware_id.as_deref().unwrap_or("?"),
                modem.network_interface.as_deref().unwrap_or("?"),
            )
        })),
    );

    manager.monitor().context("failed to start monitoring")?;

    let mut ticker = tokio::time::interval(settings.list_interval());
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let modems = manager.list();
                let mut stdout = std::io::stdout().lock();
                if args.json {
                    report::write_json(&mut stdout, &modems)?;
                } else {
                    report::write_table(&mut stdout, &modems)?;
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    info!("Shutting down");
    manager.stop_monitor()?;

    let worker = manager.clone();
    tokio::task::spawn_blocking(move || worker.wait_stopped()).await?;

    Ok(())
}
