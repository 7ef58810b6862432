#[macro_use]
extern crate log;

mod config;
pub use config::{MqttConfig, StoreConfig, parse_utc_offset};

mod monitor;
pub use monitor::{ConnectionState, LiveMonitor, MonitorHandle, Signal, run_monitor};

mod store;
pub use store::RealtimeStore;

mod history;
pub use history::{HistoryListener, run_history_listener};

pub mod display;

#[cfg(test)]
mod test_server;
