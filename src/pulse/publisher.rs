//! The `Pulse` handle: publishing and the liveness probe.
//!
//! One handle is built at startup and cloned into whatever needs to publish
//! or probe. Clones share a single `Connection` behind a `tokio` mutex; each
//! public call holds the lock for its whole connect/send/close sequence, so
//! concurrent callers never race on the same socket.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::pulse::connection::{Connection, ConnectionConfig, ConnectionState};
use crate::pulse::envelope::{Envelope, validate_exchange_name, validate_routing_key};
use crate::transport::{AmqpConnector, Connector};
use crate::utils::error::{ConnectionError, HeartbeatError, PublishError};

/// Cloneable handle to the Pulse broker.
///
/// Every clone shares the same connection. Calls on different clones are
/// serialized, so at most one session is ever open through a handle.
#[derive(Debug, Clone)]
pub struct Pulse {
    connection: Arc<Mutex<Connection>>,
}

impl Pulse {
    /// Creates a disconnected handle.
    /// Nothing touches the network until the first `connect`, `publish` or
    /// `ping`; `connector` decides which transport is used.
    pub fn new(config: ConnectionConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            connection: Arc::new(Mutex::new(Connection::new(config, connector))),
        }
    }

    /// A handle talking AMQP to the configured broker.
    pub fn amqp(config: ConnectionConfig) -> Self {
        Self::new(config, Arc::new(AmqpConnector::new()))
    }

    /// Opens the connection unless it is already open.
    /// A session dropped by the broker is replaced. Calling it twice in a
    /// row opens a single session.
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        self.connection.lock().await.connect().await
    }

    /// Closes the connection if one is open.
    /// Never fails; closing a closed handle does nothing.
    pub async fn close(&self) {
        self.connection.lock().await.close().await
    }

    /// Current connection state.
    /// A session the broker dropped reports `Disconnected` without being
    /// reopened.
    pub async fn state(&self) -> ConnectionState {
        self.connection.lock().await.state()
    }

    /// Shorthand for `state() == Connected`.
    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    /// Publishes `payload` to the topic exchange `exchange` under
    /// `routing_key`.
    ///
    /// Connects first when needed and always leaves the connection closed,
    /// whether the send succeeded or not. Nothing is retried.
    pub async fn publish<T>(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &T,
    ) -> Result<(), PublishError>
    where
        T: Serialize + ?Sized,
    {
        let prepared = prepare(exchange, routing_key, payload);

        let mut connection = self.connection.lock().await;
        let result = match prepared {
            Ok(payload) => send(&mut connection, exchange, routing_key, payload).await,
            Err(e) => Err(e),
        };
        connection.close().await;

        match &result {
            Ok(()) => info!(exchange, routing_key, "published message"),
            Err(e) => warn!(exchange, routing_key, "failed to publish message: {e}"),
        }
        result
    }

    /// Proves the broker is reachable with a fresh handshake.
    ///
    /// A connected handle is closed and reconnected; a disconnected one is
    /// connected and closed again. The final state is whatever that sequence
    /// leaves behind.
    pub async fn ping(&self) -> Result<(), HeartbeatError> {
        let mut connection = self.connection.lock().await;
        if connection.is_connected() {
            connection.close().await;
            connection.connect().await?;
        } else {
            connection.connect().await?;
            connection.close().await;
        }
        debug!(address = %connection.config().address(), "broker is reachable");
        Ok(())
    }
}

fn prepare<T>(exchange: &str, routing_key: &str, payload: &T) -> Result<Value, PublishError>
where
    T: Serialize + ?Sized,
{
    validate_exchange_name(exchange)?;
    validate_routing_key(routing_key)?;
    Ok(serde_json::to_value(payload)?)
}

async fn send(
    connection: &mut Connection,
    exchange: &str,
    routing_key: &str,
    payload: Value,
) -> Result<(), PublishError> {
    let session = connection.session().await?;
    session.declare_topic_exchange(exchange).await?;

    // Stamped only now, so a slow handshake does not skew `sent`.
    let body = Envelope::new(payload, exchange, routing_key, Utc::now()).to_vec()?;
    session.send(exchange, routing_key, &body).await
}
