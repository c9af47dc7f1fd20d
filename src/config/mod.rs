//! Loads the Pulse settings.
//!
//! Sources, later ones winning: the optional file `config/pulse.*` (any
//! format the `config` crate understands), then `PULSE_*` environment
//! variables, e.g. `PULSE_HOST` or `PULSE_USE_SSL`.

mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::Settings;

pub const DEFAULT_CONFIG_FILE: &str = "config/pulse";

/// Loads the configuration from the default file and environment variables.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(DEFAULT_CONFIG_FILE)
}

/// Like `load_config`, reading the file at `path` (extension optional).
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        // Values stay strings here; numeric and boolean fields are converted
        // while deserializing, so credentials like `0123` reach the broker as-is.
        .add_source(Environment::with_prefix("PULSE").prefix_separator("_"));

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    Ok(Settings {
        host: partial.host.unwrap_or(default.host),
        port: partial.port.unwrap_or(default.port),
        user: partial
            .user
            .ok_or_else(|| ConfigError::NotFound("PULSE_USER".to_string()))?,
        password: partial
            .password
            .ok_or_else(|| ConfigError::NotFound("PULSE_PASSWORD".to_string()))?,
        virtual_host: partial.virtual_host.unwrap_or(default.virtual_host),
        use_ssl: partial.use_ssl.unwrap_or(default.use_ssl),
        connection_timeout: partial
            .connection_timeout
            .unwrap_or(default.connection_timeout),
        treestatus_enable: partial
            .treestatus_enable
            .unwrap_or(default.treestatus_enable),
        treestatus_exchange: partial
            .treestatus_exchange
            .unwrap_or(default.treestatus_exchange),
    })
}

#[cfg(test)]
mod tests;
