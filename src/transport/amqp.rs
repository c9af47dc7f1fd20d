//! AMQP 0-9-1 transport backed by `lapin`.
//!
//! Each session is one TCP (or TLS) connection with a single channel.
//! Messages go out as persistent `application/json`.

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::uri::{AMQPAuthority, AMQPQueryString, AMQPScheme, AMQPUri, AMQPUserInfo};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::{debug, trace};

use crate::pulse::connection::ConnectionConfig;
use crate::transport::{Connector, Session};
use crate::utils::error::{ConnectionError, PublishError};

const PERSISTENT: u8 = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct AmqpConnector;

impl AmqpConnector {
    pub fn new() -> Self {
        Self
    }
}

/// Builds the broker URI. Credentials and vhost go in as structured fields,
/// so they never need percent-encoding.
pub fn amqp_uri(config: &ConnectionConfig) -> AMQPUri {
    AMQPUri {
        scheme: if config.use_tls {
            AMQPScheme::AMQPS
        } else {
            AMQPScheme::AMQP
        },
        authority: AMQPAuthority {
            userinfo: AMQPUserInfo {
                username: config.user.clone(),
                password: config.password.clone(),
            },
            host: config.host.clone(),
            port: config.port,
        },
        vhost: config.virtual_host.clone(),
        query: AMQPQueryString {
            connection_timeout: Some(config.connect_timeout.as_millis() as u64),
            ..Default::default()
        },
    }
}

fn connection_error(config: &ConnectionConfig, err: lapin::Error) -> ConnectionError {
    // lapin reports a refused login as a protocol error carrying the
    // ACCESS_REFUSED reply text.
    if err.to_string().contains("ACCESS_REFUSED") {
        ConnectionError::Authentication {
            address: config.address(),
            user: config.user.clone(),
        }
    } else {
        ConnectionError::transport(config.address(), err)
    }
}

#[async_trait]
impl Connector for AmqpConnector {
    async fn open(&self, config: &ConnectionConfig) -> Result<Box<dyn Session>, ConnectionError> {
        let uri = amqp_uri(config);
        trace!(address = %config.address(), tls = config.use_tls, "opening amqp connection");

        let handshake = async {
            let connection = Connection::connect_uri(uri, ConnectionProperties::default()).await?;
            let channel = connection.create_channel().await?;
            Ok::<_, lapin::Error>((connection, channel))
        };

        let (connection, channel) = tokio::time::timeout(config.connect_timeout, handshake)
            .await
            .map_err(|_| ConnectionError::Timeout {
                address: config.address(),
                timeout: config.connect_timeout,
            })?
            .map_err(|e| connection_error(config, e))?;

        Ok(Box::new(AmqpSession {
            address: config.address(),
            connection,
            channel,
        }))
    }
}

pub struct AmqpSession {
    address: String,
    connection: Connection,
    channel: Channel,
}

fn rejected(exchange: &str, err: impl ToString) -> PublishError {
    PublishError::Rejected {
        exchange: exchange.to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl Session for AmqpSession {
    fn is_open(&self) -> bool {
        self.connection.status().connected()
    }

    async fn declare_topic_exchange(&mut self, exchange: &str) -> Result<(), PublishError> {
        let options = ExchangeDeclareOptions {
            durable: true,
            ..Default::default()
        };
        self.channel
            .exchange_declare(exchange, ExchangeKind::Topic, options, FieldTable::default())
            .await
            .map_err(|e| rejected(exchange, e))
    }

    async fn send(
        &mut self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
    ) -> Result<(), PublishError> {
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_content_encoding("utf-8".into())
            .with_delivery_mode(PERSISTENT);

        let confirmation = self
            .channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await
            .map_err(|e| rejected(exchange, e))?
            .await
            .map_err(|e| rejected(exchange, e))?;

        if let Confirmation::Nack(_) = confirmation {
            return Err(rejected(exchange, "message was nacked by the broker"));
        }
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.connection.close(200, "OK").await {
            debug!(address = %self.address, "ignoring error while closing amqp connection: {e}");
        }
    }
}
