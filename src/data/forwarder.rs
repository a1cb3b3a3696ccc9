//! Forwarding sensor data to a time-series database
//!
//! `DataForwarder` listens on `data::#`. For each message it looks the
//! sender up in the client directory, labels the readings with the sensor
//! id and name, and hands the rendered lines to a `TimeSeriesSink`.
//! `VmSink` writes them to a VictoriaMetrics-compatible import endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, warn};

use crate::broker::{Hub, Listener, ListenerId, Message};
use crate::data::series::to_time_series;
use crate::directory::ClientDirectory;
use crate::utils::{HubError, Result};

pub const DATA_PATTERN: &str = "data::#";
const IMPORT_PATH: &str = "/api/v1/import/prometheus";

#[async_trait]
pub trait TimeSeriesSink: Send + Sync {
    async fn write(&self, lines: String) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct VmSink {
    http: reqwest::Client,
    endpoint: String,
}

impl VmSink {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}{IMPORT_PATH}", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TimeSeriesSink for VmSink {
    async fn write(&self, lines: String) -> Result<()> {
        self.http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/plain")
            .body(lines)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

pub struct DataForwarder {
    directory: Arc<dyn ClientDirectory>,
    sink: Arc<dyn TimeSeriesSink>,
}

impl DataForwarder {
    pub fn new(directory: Arc<dyn ClientDirectory>, sink: Arc<dyn TimeSeriesSink>) -> Self {
        Self { directory, sink }
    }

    pub fn attach(self: &Arc<Self>, hub: &Hub) -> ListenerId {
        hub.add_topic_listener(DATA_PATTERN, self.clone())
    }

    /// Render and write one data message. Labels carried in the payload
    /// are kept; `sensor_id` and `name` always come from the directory.
    pub async fn forward(&self, msg: &Message) -> Result<()> {
        let sender = msg
            .sender()
            .ok_or_else(|| HubError::MalformedMessage("data message without sender".to_string()))?;
        let record = self
            .directory
            .find_client(sender)
            .await?
            .ok_or_else(|| HubError::Storage(format!("unknown client {sender}")))?;

        let mut labels: BTreeMap<String, String> = match msg.payload.get("labels") {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect(),
            _ => BTreeMap::new(),
        };
        labels.insert("sensor_id".to_string(), record.id);
        labels.insert("name".to_string(), record.name);

        let lines = to_time_series(&msg.sensor_data(), &labels)?;
        self.sink.write(lines).await?;
        debug!(client_id = %sender, "Sensor data forwarded");
        Ok(())
    }
}

#[async_trait]
impl Listener for DataForwarder {
    async fn on_message(&self, _hub: &Hub, msg: &Message) {
        if let Err(e) = self.forward(msg).await {
            warn!(topic = %msg.topic, error = %e, "Failed to forward sensor data");
        }
    }
}
