//! Transport into the in-memory broker.
//!
//! Failures are translated the way the AMQP transport reports them: an
//! offline broker is unreachable, a credential mismatch is an authentication
//! error, routing failures are broker rejections.

use std::time::Duration;

use async_trait::async_trait;

use crate::broker::engine::lock;
use crate::broker::{BrokerError, ExchangeKind, SharedBroker};
use crate::pulse::connection::ConnectionConfig;
use crate::transport::{Connector, Session};
use crate::utils::error::{ConnectionError, PublishError};

#[derive(Debug, Clone)]
pub struct MemoryConnector {
    broker: SharedBroker,
    latency: Duration,
}

impl MemoryConnector {
    pub fn new(broker: SharedBroker) -> Self {
        Self {
            broker,
            latency: Duration::ZERO,
        }
    }

    /// Delays every handshake, simulating a slow network.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn broker(&self) -> &SharedBroker {
        &self.broker
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, config: &ConnectionConfig) -> Result<Box<dyn Session>, ConnectionError> {
        let address = config.address();

        if !self.latency.is_zero() {
            if self.latency >= config.connect_timeout {
                tokio::time::sleep(config.connect_timeout).await;
                return Err(ConnectionError::Timeout {
                    address,
                    timeout: config.connect_timeout,
                });
            }
            tokio::time::sleep(self.latency).await;
        }

        let generation = lock(&self.broker)
            .open_connection(&config.user, &config.password)
            .map_err(|e| match e {
                BrokerError::Offline => ConnectionError::Unreachable {
                    address: address.clone(),
                },
                BrokerError::AccessRefused(user) => ConnectionError::Authentication {
                    address: address.clone(),
                    user,
                },
                other => ConnectionError::transport(address.clone(), other),
            })?;

        Ok(Box::new(MemorySession {
            broker: self.broker.clone(),
            address,
            generation,
            closed: false,
        }))
    }
}

pub struct MemorySession {
    broker: SharedBroker,
    address: String,
    generation: u64,
    closed: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<(), PublishError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(PublishError::Connection(ConnectionError::Unreachable {
                address: self.address.clone(),
            }))
        }
    }
}

fn rejected(exchange: &str, err: BrokerError) -> PublishError {
    PublishError::Rejected {
        exchange: exchange.to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl Session for MemorySession {
    fn is_open(&self) -> bool {
        let broker = lock(&self.broker);
        !self.closed && broker.is_online() && broker.generation() == self.generation
    }

    async fn declare_topic_exchange(&mut self, exchange: &str) -> Result<(), PublishError> {
        self.ensure_open()?;
        lock(&self.broker)
            .declare_exchange(exchange, ExchangeKind::Topic)
            .map_err(|e| rejected(exchange, e))
    }

    async fn send(
        &mut self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
    ) -> Result<(), PublishError> {
        self.ensure_open()?;
        lock(&self.broker)
            .publish(exchange, routing_key, body.to_vec())
            .map(|_| ())
            .map_err(|e| rejected(exchange, e))
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            lock(&self.broker).close_connection(self.generation);
        }
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if !self.closed {
            lock(&self.broker).close_connection(self.generation);
        }
    }
}
