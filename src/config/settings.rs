use std::time::Duration;

use serde::Deserialize;

use crate::pulse::connection::{
    ConnectionConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_USE_TLS,
    DEFAULT_VIRTUAL_HOST,
};
use crate::pulse::notify::DEFAULT_TREESTATUS_EXCHANGE;

/// Pulse settings, one field per `PULSE_*` environment variable.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Broker host name (`PULSE_HOST`).
    pub host: String,

    /// Broker port (`PULSE_PORT`).
    pub port: u16,

    /// Login user (`PULSE_USER`). Required.
    pub user: String,

    /// Login password (`PULSE_PASSWORD`). Required, taken verbatim.
    pub password: String,

    /// AMQP virtual host (`PULSE_VIRTUAL_HOST`).
    pub virtual_host: String,

    /// Connect over TLS (`PULSE_USE_SSL`).
    pub use_ssl: bool,

    /// Handshake timeout in seconds (`PULSE_CONNECTION_TIMEOUT`).
    pub connection_timeout: u64,

    /// Publish tree status changes (`PULSE_TREESTATUS_ENABLE`).
    pub treestatus_enable: bool,

    /// Exchange tree status changes go to (`PULSE_TREESTATUS_EXCHANGE`).
    pub treestatus_exchange: String,
}

impl Settings {
    /// Builds the connection parameters for `Pulse` from these settings.
    /// `use_ssl` maps to TLS and the timeout is converted to a `Duration`.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(&self.host, self.port, &self.user, &self.password)
            .with_virtual_host(&self.virtual_host)
            .with_tls(self.use_ssl)
            .with_connect_timeout(Duration::from_secs(self.connection_timeout))
    }
}

/// Partial settings loaded from files or environment.
///
/// Missing optional values are filled from defaults; `user` and `password`
/// have no default.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    /// Optional broker host.
    pub host: Option<String>,

    /// Optional broker port.
    pub port: Option<u16>,

    /// Login user; loading fails without it.
    pub user: Option<String>,

    /// Login password; loading fails without it.
    pub password: Option<String>,

    /// Optional virtual host.
    pub virtual_host: Option<String>,

    /// Optional TLS switch.
    pub use_ssl: Option<bool>,

    /// Optional handshake timeout, in seconds.
    pub connection_timeout: Option<u64>,

    /// Optional notifier switch.
    pub treestatus_enable: Option<bool>,

    /// Optional notifier exchange.
    pub treestatus_exchange: Option<String>,
}

/// Defaults for everything but the credentials, which stay empty.
impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: String::new(),
            password: String::new(),
            virtual_host: DEFAULT_VIRTUAL_HOST.to_string(),
            use_ssl: DEFAULT_USE_TLS,
            connection_timeout: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            treestatus_enable: false,
            treestatus_exchange: DEFAULT_TREESTATUS_EXCHANGE.to_string(),
        }
    }
}
