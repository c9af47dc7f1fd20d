//! # treestatus-pulse
//!
//! `treestatus-pulse` is the messaging side of the tree status service: it
//! announces tree status changes on Pulse, an AMQP topic-exchange broker, and
//! lets a health check prove the broker is reachable.
//!
//! ## Core Modules
//!
//! - `pulse`: the `Pulse` handle (connection manager, publisher, liveness
//!   probe), the message envelope and the tree status notifier.
//! - `transport`: the `Connector`/`Session` seam with AMQP and in-memory
//!   implementations.
//! - `broker`: an in-memory topic-exchange broker used by tests and smoke runs.
//! - `client`: subscribers of the in-memory broker.
//! - `config`: loads `PULSE_*` settings.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod pulse;
pub mod transport;
pub mod utils;

pub use pulse::{ConnectionConfig, ConnectionState, Pulse};
pub use utils::error::{ConnectionError, HeartbeatError, PublishError};
