mod settings;

use config::{Config, ConfigError, Environment, File};

pub use settings::{
    AlertSettings, CollectSettings, DataSettings, DirectorySettings, HubSettings, LogSettings,
    PartialSettings, ServerSettings, Settings,
};

/// Prefix for environment overrides, e.g. `SENSORHUB__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "SENSORHUB";

/// Loads the configuration from `config/default` (if present) and
/// environment variables, then merges it over the default values.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge(Settings::default()))
}

#[cfg(test)]
mod tests;
