//! Tree status notifications.
//!
//! When a tree opens or closes the service announces it on Pulse under the
//! routing key `<tree>.<status>`. Notifications are optional: a disabled
//! notifier publishes nothing, and `notify_best_effort` keeps a broker outage
//! from failing the status change that triggered it.

use serde::Serialize;
use tracing::{debug, warn};

use crate::pulse::publisher::Pulse;
use crate::utils::error::PublishError;

pub const DEFAULT_TREESTATUS_EXCHANGE: &str = "exchange/treestatus/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeStatusChange {
    pub tree: String,
    pub status: String,
    pub reason: String,
    pub tags: Vec<String>,
}

impl TreeStatusChange {
    pub fn new(tree: &str, status: &str) -> Self {
        Self {
            tree: tree.to_string(),
            status: status.to_string(),
            reason: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = reason.to_string();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn routing_key(&self) -> String {
        format!("{}.{}", self.tree, self.status)
    }
}

#[derive(Debug, Clone)]
pub struct TreeStatusNotifier {
    pulse: Pulse,
    exchange: String,
    enabled: bool,
}

impl TreeStatusNotifier {
    pub fn new(pulse: Pulse, exchange: &str, enabled: bool) -> Self {
        Self {
            pulse,
            exchange: exchange.to_string(),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Publishes the change; a no-op when notifications are disabled.
    pub async fn notify(&self, change: &TreeStatusChange) -> Result<(), PublishError> {
        if !self.enabled {
            debug!(tree = %change.tree, "tree status notifications disabled");
            return Ok(());
        }
        self.pulse
            .publish(&self.exchange, &change.routing_key(), change)
            .await
    }

    /// Like `notify`, but a failure is only logged. Returns whether the
    /// notification went out (or was not needed).
    pub async fn notify_best_effort(&self, change: &TreeStatusChange) -> bool {
        match self.notify(change).await {
            Ok(()) => true,
            Err(e) => {
                warn!(tree = %change.tree, status = %change.status, "tree status notification dropped: {e}");
                false
            }
        }
    }
}
