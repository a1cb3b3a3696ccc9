//! # SensorHub
//!
//! `sensorhub` is the message hub of a sensor monitoring platform. Sensors,
//! plugins and internal modules exchange topic-addressed JSON messages
//! through one in-process bus; per-scope permissions decide who may read
//! and write what.
//!
//! ## Core Modules
//!
//! - `broker`: topics, messages, the hub loop and internal listeners.
//! - `client`: the broker-side client and its permissions.
//! - `directory`: who a client is and which sensors must be polled.
//! - `alert`: alert rules, their evaluation and notification actions.
//! - `collect`: the scheduler that pulls data from active sensors.
//! - `data`: forwarding sensor readings to a time-series database.
//! - `persistence`: on-disk storage for alert records.
//! - `transport`: the websocket adapter.
//! - `config`: layered configuration loading.
//! - `utils`: error type and logging setup.

pub mod alert;
pub mod broker;
pub mod client;
pub mod collect;
pub mod config;
pub mod data;
pub mod directory;
pub mod persistence;
pub mod transport;
pub mod utils;
