//! Connection manager
//!
//! Owns the single broker session shared by every publish and probe.
//! `connect` on a live session and `close` on a closed one are no-ops; a
//! session the peer dropped silently is replaced on the next `connect`.
//!
//! `Connection` itself is not synchronized. `Pulse` wraps it in a mutex and
//! runs each connect/publish/close sequence as one critical section.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::transport::{Connector, Session};
use crate::utils::error::ConnectionError;

pub const DEFAULT_HOST: &str = "pulse.mozilla.org";
pub const DEFAULT_PORT: u16 = 5671;
pub const DEFAULT_VIRTUAL_HOST: &str = "/";
pub const DEFAULT_USE_TLS: bool = true;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Parameters of a broker connection. Immutable once a `Connection` is
/// built from it.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub virtual_host: String,
    pub use_tls: bool,
    pub connect_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(host: &str, port: u16, user: &str, password: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            user: user.to_string(),
            password: password.to_string(),
            virtual_host: DEFAULT_VIRTUAL_HOST.to_string(),
            use_tls: DEFAULT_USE_TLS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_virtual_host(mut self, virtual_host: &str) -> Self {
        self.virtual_host = virtual_host.to_string();
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// `host:port`, used in logs and errors.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Credentials never end up in logs.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("virtual_host", &self.virtual_host)
            .field("use_tls", &self.use_tls)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

pub struct Connection {
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    session: Option<Box<dyn Session>>,
}

impl Connection {
    pub fn new(config: ConnectionConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            session: None,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        match &self.session {
            Some(session) if session.is_open() => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Opens the transport unless a live session already exists.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        self.session().await.map(|_| ())
    }

    /// The live session, connecting first if needed.
    pub(crate) async fn session(
        &mut self,
    ) -> Result<&mut (dyn Session + 'static), ConnectionError> {
        if self.session.as_ref().is_some_and(|s| !s.is_open()) {
            debug!(address = %self.config.address(), "session dropped by peer, reconnecting");
            self.close().await;
        }

        if self.session.is_none() {
            let session = self.connector.open(&self.config).await?;
            debug!(
                address = %self.config.address(),
                vhost = %self.config.virtual_host,
                tls = self.config.use_tls,
                "connected to broker"
            );
            self.session = Some(session);
        }

        self.session
            .as_deref_mut()
            .ok_or_else(|| ConnectionError::Unreachable {
                address: self.config.address(),
            })
    }

    /// Releases the transport. Never fails; errors from a half-closed peer
    /// are swallowed by the session.
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
            debug!(address = %self.config.address(), "closed broker connection");
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}
