//! CLI for SensorHub
//!
//! Subcommands:
//! - `server`: run the hub with its alert, collection and data modules
//! - `rules`: list the alert rules found in the rules directory

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use sensorhub::alert::{
    ActionDispatcher, ActionType, AlertEngine, FileRuleStore, RuleStore, WebhookSender,
};
use sensorhub::broker::Hub;
use sensorhub::collect::{CollectionScheduler, FailureTracker, HttpPuller};
use sensorhub::config::{Settings, load_config};
use sensorhub::data::{DataForwarder, VmSink};
use sensorhub::directory::InMemoryDirectory;
use sensorhub::persistence::SledRecordStore;
use sensorhub::transport::start_websocket_server;
use sensorhub::utils::logging;

#[derive(Parser)]
#[command(name = "sensorhub")]
enum Command {
    /// Start the hub and the websocket server
    Server,
    /// Print the names of the stored alert rules
    Rules,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cmd = Command::parse();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    logging::init(&config.log.level);

    let outcome = match cmd {
        Command::Server => run_server(config).await,
        Command::Rules => list_rules(&config).await,
    };
    if let Err(e) = outcome {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run_server(config: Settings) -> sensorhub::utils::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let timeout = Duration::from_secs(config.collect.request_timeout_secs);

    let (hub, runner) = Hub::new(&config.hub);
    tokio::spawn(runner.run());

    let directory = Arc::new(InMemoryDirectory::load_json(&config.directory.clients_file).await?);
    info!(clients = directory.len().await, "Client directory loaded");

    let actions = ActionDispatcher::new()
        .with_sender(ActionType::Webhook, Arc::new(WebhookSender::new(timeout)?));
    let alerts = Arc::new(AlertEngine::new(
        Arc::new(FileRuleStore::new(&config.alert.rules_dir)),
        Arc::new(SledRecordStore::open(&config.alert.records_path)?),
        Arc::new(actions),
    ));
    alerts.refresh_rules().await?;
    alerts.attach(&hub);

    if config.data.enabled {
        let forwarder = Arc::new(DataForwarder::new(
            directory.clone(),
            Arc::new(VmSink::new(&config.data.vmdb_url, timeout)?),
        ));
        forwarder.attach(&hub);
        info!(vmdb_url = %config.data.vmdb_url, "Data forwarding enabled");
    }

    let scheduler = CollectionScheduler::new(
        hub.clone(),
        directory.clone(),
        Arc::new(HttpPuller::new(timeout)?),
        Arc::new(FailureTracker::from_settings(&config.collect)),
        Duration::from_millis(config.collect.tick_millis.max(1)),
    );
    tokio::spawn(scheduler.run());

    tokio::select! {
        result = start_websocket_server(&addr, hub, directory) => {
            result?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn list_rules(config: &Settings) -> sensorhub::utils::Result<()> {
    let store = FileRuleStore::new(&config.alert.rules_dir);
    for rule in store.load().await? {
        println!("{}\t{}\t{}", rule.name, rule.level, rule.conditions.len());
    }
    Ok(())
}
