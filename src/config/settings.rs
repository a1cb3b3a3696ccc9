use serde::Deserialize;

/// Top-level configuration settings for the hub process.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub hub: HubSettings,
    pub alert: AlertSettings,
    pub collect: CollectSettings,
    pub data: DataSettings,
    pub directory: DirectorySettings,
    pub log: LogSettings,
}

/// Address the websocket adapter binds to.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Queue sizes for the hub.
///
/// `intake_capacity` bounds each of the register, unregister and broadcast
/// queues; `client_queue_capacity` bounds every client's outbound queue.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HubSettings {
    pub intake_capacity: usize,
    pub client_queue_capacity: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AlertSettings {
    pub rules_dir: String,
    pub records_path: String,
}

/// Collection scheduler timing and circuit-breaker policy.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CollectSettings {
    pub tick_millis: u64,
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DataSettings {
    pub enabled: bool,
    pub vmdb_url: String,
}

/// Seed file for the in-memory client directory: a JSON array of client
/// records. A missing file means an empty directory.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DirectorySettings {
    pub clients_file: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration loaded from files or environment.
///
/// Every field is optional; missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub hub: Option<PartialHubSettings>,
    pub alert: Option<PartialAlertSettings>,
    pub collect: Option<PartialCollectSettings>,
    pub data: Option<PartialDataSettings>,
    pub directory: Option<PartialDirectorySettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialHubSettings {
    pub intake_capacity: Option<usize>,
    pub client_queue_capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialAlertSettings {
    pub rules_dir: Option<String>,
    pub records_path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialCollectSettings {
    pub tick_millis: Option<u64>,
    pub failure_threshold: Option<u32>,
    pub cooldown_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialDataSettings {
    pub enabled: Option<bool>,
    pub vmdb_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialDirectorySettings {
    pub clients_file: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            hub: HubSettings::default(),
            alert: AlertSettings {
                rules_dir: "config/alert/rules".to_string(),
                records_path: "alert_records_db".to_string(),
            },
            collect: CollectSettings::default(),
            data: DataSettings {
                enabled: true,
                vmdb_url: "http://localhost:8428".to_string(),
            },
            directory: DirectorySettings {
                clients_file: "config/clients.json".to_string(),
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            intake_capacity: 100,
            client_queue_capacity: 256,
        }
    }
}

impl Default for CollectSettings {
    fn default() -> Self {
        Self {
            tick_millis: 1000,
            failure_threshold: 3,
            cooldown_secs: 120,
            request_timeout_secs: 5,
        }
    }
}

impl PartialSettings {
    /// Fill every missing value from `default`.
    pub fn merge(self, default: Settings) -> Settings {
        let server = self.server.unwrap_or_default();
        let hub = self.hub.unwrap_or_default();
        let alert = self.alert.unwrap_or_default();
        let collect = self.collect.unwrap_or_default();
        let data = self.data.unwrap_or_default();
        let directory = self.directory.unwrap_or_default();
        let log = self.log.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(default.server.host),
                port: server.port.unwrap_or(default.server.port),
            },
            hub: HubSettings {
                intake_capacity: hub.intake_capacity.unwrap_or(default.hub.intake_capacity),
                client_queue_capacity: hub
                    .client_queue_capacity
                    .unwrap_or(default.hub.client_queue_capacity),
            },
            alert: AlertSettings {
                rules_dir: alert.rules_dir.unwrap_or(default.alert.rules_dir),
                records_path: alert.records_path.unwrap_or(default.alert.records_path),
            },
            collect: CollectSettings {
                tick_millis: collect.tick_millis.unwrap_or(default.collect.tick_millis),
                failure_threshold: collect
                    .failure_threshold
                    .unwrap_or(default.collect.failure_threshold),
                cooldown_secs: collect.cooldown_secs.unwrap_or(default.collect.cooldown_secs),
                request_timeout_secs: collect
                    .request_timeout_secs
                    .unwrap_or(default.collect.request_timeout_secs),
            },
            data: DataSettings {
                enabled: data.enabled.unwrap_or(default.data.enabled),
                vmdb_url: data.vmdb_url.unwrap_or(default.data.vmdb_url),
            },
            directory: DirectorySettings {
                clients_file: directory
                    .clients_file
                    .unwrap_or(default.directory.clients_file),
            },
            log: LogSettings {
                level: log.level.unwrap_or(default.log.level),
            },
        }
    }
}
