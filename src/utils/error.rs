//! The `error` module defines the error types surfaced by the Pulse publisher.
//!
//! Three kinds cross the crate boundary:
//!
//! - [`ConnectionError`]: the broker connection could not be established.
//! - [`PublishError`]: a publish call failed, including because its connect
//!   step failed (wrapped as [`PublishError::Connection`]).
//! - [`HeartbeatError`]: the liveness probe could not reach the broker. The
//!   transport cause is kept as its `source` for logging only.

use std::time::Duration;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("broker at {address} is unreachable")]
    Unreachable { address: String },

    #[error("timed out after {timeout:?} connecting to {address}")]
    Timeout { address: String, timeout: Duration },

    #[error("broker at {address} refused the credentials of user {user}")]
    Authentication { address: String, user: String },

    #[error("transport error talking to {address}: {source}")]
    Transport {
        address: String,
        #[source]
        source: BoxError,
    },
}

impl ConnectionError {
    pub fn transport(address: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            address: address.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid exchange name {name:?}: {reason}")]
    InvalidExchange { name: String, reason: &'static str },

    #[error("invalid routing key {key:?}: {reason}")]
    InvalidRoutingKey { key: String, reason: &'static str },

    #[error("failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("could not connect to broker: {0}")]
    Connection(#[from] ConnectionError),

    #[error("broker rejected message for exchange {exchange}: {reason}")]
    Rejected { exchange: String, reason: String },
}

/// The broker could not be reached by the liveness probe.
#[derive(Debug, Error)]
#[error("cannot connect to the pulse service")]
pub struct HeartbeatError {
    #[from]
    source: ConnectionError,
}

impl HeartbeatError {
    pub fn cause(&self) -> &ConnectionError {
        &self.source
    }
}
