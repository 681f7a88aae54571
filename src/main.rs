use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use log::info;

mod config;
mod display;
mod manager;
mod messages;
mod mqtt;
mod snapshot;
mod state;
mod zones;

/// Publishes FindMy device locations to MQTT for Home Assistant discovery.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Path to the known locations JSON file
    #[arg(short, long)]
    locations: PathBuf,

    /// Republish every device on every scan, ignoring timestamps
    #[arg(short, long)]
    force_sync: bool,

    /// Hide per-device details from the console output
    #[arg(short, long)]
    privacy: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let mut config = config::AppConfig::load(&args.config)?;
    // Prefer the environment for the broker password so it stays out of the
    // config file.
    if let Ok(password) = std::env::var("MQTT_CLIENT_PASSWORD") {
        config.mqtt.password = Some(password);
    }

    let zones = zones::load_zones(&args.locations)?;

    let scan = config.scan.unwrap_or_default();
    let settings = manager::ScanSettings {
        cache_dir: scan
            .cache_dir
            .or_else(snapshot::default_cache_dir)
            .context("could not determine the FindMy cache directory")?,
        interval: Duration::from_secs(scan.interval_seconds.unwrap_or(5)),
        force_sync: args.force_sync,
        privacy: args.privacy,
    };

    let (mqtt_client, mut eventloop) = mqtt::MqttClient::new(&config.mqtt);
    tokio::task::spawn(async move {
        mqtt::MqttClient::drive(&mut eventloop).await;
    });

    let core = manager::Manager::new(mqtt_client.clone(), zones, settings);
    tokio::select! {
        () = core.run_loop() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            info!("Shutting down");
        }
    }

    mqtt_client.disconnect().await?;

    Ok(())
}
