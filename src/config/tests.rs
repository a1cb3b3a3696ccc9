use super::{Settings, load_config_from};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.hub.intake_capacity, 100);
    assert_eq!(settings.collect.tick_millis, 1000);
    assert_eq!(settings.collect.failure_threshold, 3);
    assert_eq!(settings.collect.cooldown_secs, 120);
    assert_eq!(settings.alert.rules_dir, "config/alert/rules");
    assert_eq!(settings.directory.clients_file, "config/clients.json");
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("absent");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg, Settings::default());
}

#[test]
#[serial]
fn test_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [hub]
        intake_capacity = 10

        [collect]
        cooldown_secs = 30
    "#;
    fs::write(tmp.path().join("default.toml"), toml).expect("write config file");
    let path = tmp.path().join("default");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.hub.intake_capacity, 10);
    // untouched values keep their defaults
    assert_eq!(cfg.hub.client_queue_capacity, 256);
    assert_eq!(cfg.collect.cooldown_secs, 30);
    assert_eq!(cfg.collect.failure_threshold, 3);
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    fs::write(
        tmp.path().join("default.toml"),
        "[server]\nport = 9000\n",
    )
    .expect("write config file");
    let path = tmp.path().join("default");

    temp_env::with_vars(
        [
            ("SENSORHUB__SERVER__PORT", Some("9100")),
            ("SENSORHUB__DATA__VMDB_URL", Some("http://vm:8428")),
        ],
        || {
            let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
            assert_eq!(cfg.server.port, 9100);
            assert_eq!(cfg.data.vmdb_url, "http://vm:8428");
        },
    );
}
