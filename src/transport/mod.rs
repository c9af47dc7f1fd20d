//! The `transport` module is the seam between the publisher and a broker.
//!
//! A [`Connector`] opens [`Session`]s from a `ConnectionConfig`. Two
//! implementations exist: [`amqp::AmqpConnector`] speaks AMQP 0-9-1 to a
//! real broker, [`memory::MemoryConnector`] talks to the in-memory broker.

pub mod amqp;
pub mod memory;

use async_trait::async_trait;

use crate::pulse::connection::ConnectionConfig;
use crate::utils::error::{ConnectionError, PublishError};

pub use amqp::AmqpConnector;
pub use memory::MemoryConnector;

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Establishes a session, bounded by `config.connect_timeout`.
    async fn open(&self, config: &ConnectionConfig) -> Result<Box<dyn Session>, ConnectionError>;
}

/// One authenticated connection to a broker.
#[async_trait]
pub trait Session: Send {
    /// False once the peer dropped the connection.
    fn is_open(&self) -> bool;

    /// Declares a durable topic exchange; a no-op when it already exists.
    async fn declare_topic_exchange(&mut self, exchange: &str) -> Result<(), PublishError>;

    async fn send(&mut self, exchange: &str, routing_key: &str, body: &[u8])
    -> Result<(), PublishError>;

    /// Best-effort release; must not fail on a half-closed transport.
    async fn close(&mut self);
}
