//! Collection scheduler
//!
//! Every tick the scheduler asks its `CollectionSource` for the active
//! sensors that carry a collection profile and starts one pull task for
//! each sensor that is due and whose endpoint is not suspended. A
//! successful pull is published on `data::<client_id>` with the sensor as
//! sender; a failed one is counted against the endpoint and logged.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::broker::message::SensorDataPayload;
use crate::broker::topic::DELIMITER;
use crate::broker::{Hub, Message};
use crate::client::permission::DATA_SCOPE;
use crate::collect::puller::DataPuller;
use crate::collect::tracker::FailureTracker;
use crate::directory::{ActiveSensor, CollectionSource};

#[derive(Clone)]
pub struct CollectionScheduler {
    hub: Hub,
    source: Arc<dyn CollectionSource>,
    puller: Arc<dyn DataPuller>,
    tracker: Arc<FailureTracker>,
    tick: Duration,
}

impl CollectionScheduler {
    pub fn new(
        hub: Hub,
        source: Arc<dyn CollectionSource>,
        puller: Arc<dyn DataPuller>,
        tracker: Arc<FailureTracker>,
        tick: Duration,
    ) -> Self {
        Self {
            hub,
            source,
            puller,
            tracker,
            tick,
        }
    }

    pub fn tracker(&self) -> &Arc<FailureTracker> {
        &self.tracker
    }

    /// Tick forever. Meant to be spawned.
    pub async fn run(self) {
        info!(tick_millis = self.tick.as_millis() as u64, "Collection scheduler started");
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.run_tick().await;
        }
    }

    /// Run one tick. Returns the handles of the pull tasks it started.
    pub async fn run_tick(&self) -> Vec<JoinHandle<()>> {
        let sensors = match self.source.list_active_sensors_with_profile().await {
            Ok(sensors) => sensors,
            Err(e) => {
                warn!(error = %e, "Failed to list active sensors");
                return Vec::new();
            }
        };

        let now = Utc::now();
        let mut handles = Vec::new();
        for sensor in sensors {
            let endpoint = &sensor.profile.endpoint;
            if !self.tracker.can_request(endpoint) {
                debug!(client_id = %sensor.client_id, endpoint = %endpoint, "Endpoint suspended, pull skipped");
                continue;
            }
            if !sensor.profile.is_due(now) {
                continue;
            }

            let this = self.clone();
            handles.push(tokio::spawn(async move { this.collect_one(sensor).await }));
        }
        handles
    }

    async fn collect_one(&self, sensor: ActiveSensor) {
        let ActiveSensor { client_id, profile } = sensor;

        let result = match self.puller.pull(&profile).await {
            Ok(result) => result,
            Err(e) => {
                self.tracker.record_failure(&profile.endpoint);
                error!(client_id = %client_id, endpoint = %profile.endpoint, error = %e, "Failed to pull sensor data");
                return;
            }
        };

        let payload = SensorDataPayload {
            sender_id: client_id.clone(),
            data: result.data,
            labels: result.labels,
        };
        match serde_json::to_value(&payload) {
            Ok(value) => {
                let topic = format!("{DATA_SCOPE}{DELIMITER}{client_id}");
                self.hub.broadcast(Message::new(topic, value));
            }
            Err(e) => {
                error!(client_id = %client_id, error = %e, "Failed to encode pulled data");
                return;
            }
        }

        if let Err(e) = self.source.mark_collected(&client_id, Utc::now()).await {
            warn!(client_id = %client_id, error = %e, "Failed to record collection time");
        }
    }
}
