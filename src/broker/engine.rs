//! Broker engine
//!
//! Manages exchanges, subscribers and connection bookkeeping for the
//! in-memory broker. The API is synchronous and meant to sit behind a lock
//! (`SharedBroker`); callers must not hold the lock across an `.await`.
//!
//! Error messages mirror the reply texts of an AMQP 0-9-1 broker so that code
//! exercised against this engine sees the same failures it would in
//! production.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::broker::exchange::{Exchange, ExchangeKind};
use crate::broker::message::Delivery;
use crate::client::{Subscriber, SubscriberId, Subscription};

pub type SharedBroker = Arc<Mutex<Broker>>;

/// Locks a shared broker, recovering the state if a previous holder panicked.
pub fn lock(broker: &SharedBroker) -> MutexGuard<'_, Broker> {
    broker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Failures reported by the in-memory broker.
/// The display texts follow the AMQP reply codes a real broker would send.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("NOT_FOUND - no exchange '{0}'")]
    ExchangeNotFound(String),

    #[error(
        "PRECONDITION_FAILED - inequivalent arg 'type' for exchange '{name}': received '{requested}' but current is '{current}'"
    )]
    KindMismatch {
        name: String,
        requested: ExchangeKind,
        current: ExchangeKind,
    },

    #[error("ACCESS_REFUSED - login refused for user '{0}'")]
    AccessRefused(String),

    #[error("broker is offline")]
    Offline,
}

/// The in-memory broker.
///
/// Besides routing, it keeps track of connections so tests can observe how a
/// publisher uses them: how many are open right now, the most ever open at
/// once, and how many were opened in total. Every restart bumps a
/// generation counter; sessions from an older generation are considered
/// dropped by the peer.
#[derive(Debug, Default)]
pub struct Broker {
    exchanges: HashMap<String, Exchange>,
    subscribers: HashMap<SubscriberId, Subscriber>,
    credentials: Option<(String, String)>,
    offline: bool,
    generation: u64,
    open_connections: usize,
    peak_connections: usize,
    connections_opened: u64,
}

impl Broker {
    /// Creates an online broker with no exchanges and no credential check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept connections that present these credentials.
    pub fn with_credentials(mut self, user: &str, password: &str) -> Self {
        self.credentials = Some((user.to_string(), password.to_string()));
        self
    }

    /// Wraps the broker so connectors and tests can share it.
    pub fn into_shared(self) -> SharedBroker {
        Arc::new(Mutex::new(self))
    }

    /// Whether the broker currently accepts connections and publishes.
    pub fn is_online(&self) -> bool {
        !self.offline
    }

    /// Taking the broker offline drops every open connection.
    pub fn set_online(&mut self, online: bool) {
        if !online && !self.offline {
            self.drop_connections();
        }
        self.offline = !online;
    }

    /// Drops every open connection without refusing new ones.
    pub fn restart(&mut self) {
        self.drop_connections();
    }

    fn drop_connections(&mut self) {
        debug!(dropped = self.open_connections, "dropping broker connections");
        self.generation += 1;
        self.open_connections = 0;
    }

    /// Current generation. Sessions opened under an older one were dropped
    /// by a restart or an outage.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Accepts a new connection and returns the generation it belongs to.
    pub fn open_connection(&mut self, user: &str, password: &str) -> Result<u64, BrokerError> {
        if self.offline {
            return Err(BrokerError::Offline);
        }
        if let Some((expected_user, expected_password)) = &self.credentials {
            if expected_user != user || expected_password != password {
                warn!(user, "refusing connection");
                return Err(BrokerError::AccessRefused(user.to_string()));
            }
        }
        self.open_connections += 1;
        self.connections_opened += 1;
        self.peak_connections = self.peak_connections.max(self.open_connections);
        Ok(self.generation)
    }

    /// Releases a connection. Connections from a previous generation were
    /// already dropped and are ignored.
    pub fn close_connection(&mut self, generation: u64) {
        if generation == self.generation {
            self.open_connections = self.open_connections.saturating_sub(1);
        }
    }

    /// Connections open right now.
    pub fn open_connections(&self) -> usize {
        self.open_connections
    }

    /// The most connections that were ever open at the same time.
    /// Used to check that publishers never overlap their sessions.
    pub fn peak_connections(&self) -> usize {
        self.peak_connections
    }

    /// Total number of connections accepted since the broker was created.
    pub fn connections_opened(&self) -> u64 {
        self.connections_opened
    }

    /// Declares an exchange. Redeclaring with the same kind is a no-op.
    pub fn declare_exchange(&mut self, name: &str, kind: ExchangeKind) -> Result<(), BrokerError> {
        match self.exchanges.get(name) {
            Some(existing) if existing.kind != kind => Err(BrokerError::KindMismatch {
                name: name.to_string(),
                requested: kind,
                current: existing.kind,
            }),
            Some(_) => Ok(()),
            None => {
                self.exchanges
                    .insert(name.to_string(), Exchange::new(name, kind));
                debug!(exchange = name, %kind, "declared exchange");
                Ok(())
            }
        }
    }

    /// Number of registered subscribers, bound or not.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Looks up a declared exchange.
    pub fn exchange(&self, name: &str) -> Option<&Exchange> {
        self.exchanges.get(name)
    }

    /// Binds a new subscriber to an exchange. The exchange is declared as a
    /// topic exchange if it does not exist yet.
    pub fn subscribe(&mut self, exchange: &str, pattern: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Subscriber::new(tx);
        let id = subscriber.id.clone();
        self.subscribers.insert(id.clone(), subscriber);

        self.exchanges
            .entry(exchange.to_string())
            .or_insert_with(|| Exchange::new(exchange, ExchangeKind::Topic))
            .bind(id.clone(), pattern);

        debug!(subscriber = %id, exchange, pattern, "subscribed");
        Subscription::new(id, rx)
    }

    /// Unbinds a subscriber from one exchange. Unknown exchanges are ignored.
    pub fn unsubscribe(&mut self, exchange: &str, subscriber: &SubscriberId) {
        if let Some(e) = self.exchanges.get_mut(exchange) {
            e.unbind(subscriber);
        }
    }

    /// Routes a message to every matching subscriber and returns how many
    /// received it. Publishing to an undeclared exchange is an error, like on
    /// a real broker.
    ///
    /// Subscribers whose `Subscription` was dropped are removed along the
    /// way, bindings included.
    pub fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        body: Vec<u8>,
    ) -> Result<usize, BrokerError> {
        if self.offline {
            return Err(BrokerError::Offline);
        }
        let target = self
            .exchanges
            .get(exchange)
            .ok_or_else(|| BrokerError::ExchangeNotFound(exchange.to_string()))?;

        let delivery = Delivery {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            body,
            delivered_at: chrono::Utc::now().timestamp_millis(),
        };

        let mut delivered = 0;
        let mut gone = Vec::new();
        for sub_id in target.route(routing_key) {
            match self.subscribers.get(&sub_id) {
                Some(subscriber) => match subscriber.sender.send(delivery.clone()) {
                    Ok(()) => delivered += 1,
                    Err(_) => {
                        debug!("Subscriber {sub_id} went away, dropping it");
                        gone.push(sub_id);
                    }
                },
                None => warn!("No subscriber registered with id: {sub_id}"),
            }
        }
        for sub_id in &gone {
            self.cleanup_subscriber(sub_id);
        }
        trace!(exchange, routing_key, delivered, "routed message");
        Ok(delivered)
    }

    /// Removes a subscriber and every binding it holds.
    pub fn cleanup_subscriber(&mut self, subscriber: &SubscriberId) {
        self.subscribers.remove(subscriber);
        for exchange in self.exchanges.values_mut() {
            exchange.unbind(subscriber);
        }
        debug!("Cleaned up subscriber {subscriber}");
    }
}
