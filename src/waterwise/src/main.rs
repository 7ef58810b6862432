#[macro_use]
extern crate log;

use std::time::Duration;

use anyhow::Context;
use chrono::{FixedOffset, Utc};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use dotenv::dotenv;
use tokio::sync::watch;
use waterwise::{
    HistoryListener, LiveMonitor, MonitorHandle, MqttConfig, RealtimeStore, StoreConfig,
    display::{HistoryReport, HistoryView},
    parse_utc_offset, run_history_listener, run_monitor,
};
use waterwise_algos::WeeklyHistoryAggregator;
use waterwise_codec::Topics;

#[derive(Parser)]
pub struct WaterWiseCli {
    /// Offset of the garden's local time, used for calendar days
    #[arg(env, long, default_value = "+07:00", value_parser = parse_utc_offset)]
    pub utc_offset: FixedOffset,
    #[clap(subcommand)]
    pub subcommand: WaterWiseCommand,
}

#[derive(Subcommand)]
pub enum WaterWiseCommand {
    ///
    /// Follow live moisture and pump status over MQTT
    ///
    Monitor {
        #[clap(flatten)]
        mqtt: MqttArgs,
    },
    ///
    /// Print the weekly moisture history once
    ///
    History {
        #[clap(flatten)]
        store: StoreArgs,
        #[arg(long)]
        json: bool,
    },
    ///
    /// Reprint the weekly history whenever stored readings change
    ///
    WatchHistory {
        #[clap(flatten)]
        store: StoreArgs,
    },
    ///
    /// Live monitor and weekly history together
    ///
    Dashboard {
        #[clap(flatten)]
        mqtt: MqttArgs,
        #[clap(flatten)]
        store: StoreArgs,
    },
    ///
    /// Generate shell completions
    ///
    Completions { shell: Shell },
}

#[derive(Args)]
pub struct MqttArgs {
    #[arg(env, long)]
    pub mqtt_host: String,
    #[arg(env, long, default_value_t = 8883)]
    pub mqtt_port: u16,
    #[arg(env, long)]
    pub mqtt_username: Option<String>,
    #[arg(env, long)]
    pub mqtt_password: Option<String>,
    /// Connect over plain TCP instead of TLS
    #[arg(env, long)]
    pub mqtt_no_tls: bool,
    #[arg(env, long)]
    pub mqtt_client_id: Option<String>,
    #[arg(env, long, default_value = Topics::DEFAULT_MOISTURE)]
    pub moisture_topic: String,
    #[arg(env, long, default_value = Topics::DEFAULT_PUMP)]
    pub pump_topic: String,
    /// Keep-alive interval in seconds
    #[arg(env, long, default_value_t = 25)]
    pub mqtt_keep_alive: u64,
    /// Delay before reconnecting, in milliseconds
    #[arg(env, long, default_value_t = 1000)]
    pub reconnect_delay_ms: u64,
}

impl MqttArgs {
    fn config(self) -> MqttConfig {
        let mut config = MqttConfig::new(self.mqtt_host, self.mqtt_port);
        config.username = self.mqtt_username;
        config.password = self.mqtt_password;
        config.use_tls = !self.mqtt_no_tls;
        if let Some(client_id) = self.mqtt_client_id {
            config.client_id = client_id;
        }
        config.topics = Topics {
            moisture: self.moisture_topic,
            pump: self.pump_topic,
        };
        config.keep_alive = Duration::from_secs(self.mqtt_keep_alive);
        config.reconnect_delay = Duration::from_millis(self.reconnect_delay_ms);
        config
    }
}

#[derive(Args)]
pub struct StoreArgs {
    #[arg(env, long)]
    pub database_url: String,
    #[arg(env, long, default_value = StoreConfig::DEFAULT_PATH)]
    pub readings_path: String,
    #[arg(env, long)]
    pub database_auth: Option<String>,
    /// Delay before re-opening a dropped history stream, in milliseconds
    #[arg(env, long, default_value_t = 1000)]
    pub history_retry_ms: u64,
}

impl StoreArgs {
    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.history_retry_ms)
    }

    fn store(self) -> RealtimeStore {
        RealtimeStore::new(StoreConfig {
            database_url: self.database_url,
            path: self.readings_path,
            auth: self.database_auth,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(error) = dotenv() {
        println!("{}", error);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("rumqttc", log::LevelFilter::Warn)
        .filter_module("reqwest", log::LevelFilter::Warn)
        .init();

    let cli = WaterWiseCli::parse();
    let offset = cli.utc_offset;

    let (stop, shutdown) = watch::channel(false);
    ctrlc::set_handler(move || {
        info!("Shutting down...");
        stop.send_replace(true);
    })
    .context("failed to install Ctrl-C handler")?;

    match cli.subcommand {
        WaterWiseCommand::Monitor { mqtt } => {
            let config = mqtt.config();
            let monitor = LiveMonitor::new(config.topics.clone());

            let printer = print_monitor(monitor.handle(), shutdown.clone());
            let (result, _) = tokio::join!(run_monitor(&config, &monitor, shutdown), printer);
            result
        }
        WaterWiseCommand::History { store, json } => {
            let store = store.store();
            let listener = HistoryListener::new(WeeklyHistoryAggregator::new(offset));

            let snapshot = match store.fetch().await {
                Ok(snapshot) => snapshot,
                Err(error) => {
                    error!("Failed to read moisture history: {error:#}");
                    return Ok(());
                }
            };

            let Some(summary) = listener.apply_snapshot(&snapshot, Utc::now()) else {
                println!("No moisture history available");
                return Ok(());
            };

            let report = HistoryReport::new(&summary, offset);
            if json {
                println!("{}", serde_json::to_string_pretty(&report.to_json())?);
            } else {
                println!("{}", report);
            }

            Ok(())
        }
        WaterWiseCommand::WatchHistory { store } => {
            let retry_delay = store.retry_delay();
            let store = store.store();
            let listener = HistoryListener::new(WeeklyHistoryAggregator::new(offset));

            let printer = print_history(listener.subscribe(), offset, shutdown.clone());
            let (result, _) = tokio::join!(
                run_history_listener(&store, &listener, retry_delay, Utc::now, shutdown),
                printer
            );
            result
        }
        WaterWiseCommand::Dashboard { mqtt, store } => {
            let config = mqtt.config();
            let monitor = LiveMonitor::new(config.topics.clone());

            let retry_delay = store.retry_delay();
            let store = store.store();
            let listener = HistoryListener::new(WeeklyHistoryAggregator::new(offset));

            let (live, history, _, _) = tokio::join!(
                run_monitor(&config, &monitor, shutdown.clone()),
                run_history_listener(&store, &listener, retry_delay, Utc::now, shutdown.clone()),
                print_monitor(monitor.handle(), shutdown.clone()),
                print_history(listener.subscribe(), offset, shutdown),
            );
            live.and(history)
        }
        WaterWiseCommand::Completions { shell } => {
            let mut command = WaterWiseCli::command();
            clap_complete::generate(shell, &mut command, "waterwise", &mut std::io::stdout());
            Ok(())
        }
    }
}

async fn print_monitor(mut handle: MonitorHandle, mut shutdown: watch::Receiver<bool>) {
    println!("{}\n", handle.view());

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            changed = handle.changed() => if !changed {
                break;
            },
        }

        println!("{}\n", handle.view());
    }
}

async fn print_history(
    mut view: watch::Receiver<HistoryView>,
    offset: FixedOffset,
    mut shutdown: watch::Receiver<bool>,
) {
    println!("Weekly History\nLoading...\n");

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            changed = view.changed() => if changed.is_err() {
                break;
            },
        }

        if let HistoryView::Ready(summary) = &*view.borrow_and_update() {
            println!("{}\n", HistoryReport::new(summary, offset));
        }
    }
}
