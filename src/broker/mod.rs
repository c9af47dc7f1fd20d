//! In-memory topic-exchange broker.
//!
//! Stands in for a real AMQP broker in tests and local smoke runs: exchanges
//! route deliveries to subscribers whose binding pattern matches the routing
//! key. Nothing is persisted.

pub mod engine;
pub mod exchange;
pub mod message;

pub use engine::{Broker, BrokerError, SharedBroker};
pub use exchange::{Exchange, ExchangeKind};
pub use message::Delivery;

#[cfg(test)]
mod tests;
