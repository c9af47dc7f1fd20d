use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::broker::message::Delivery;

pub type SubscriberId = String;

/// Represents a consumer bound to one or more exchanges.
#[derive(Debug)]
pub struct Subscriber {
    /// Unique identifier for the subscriber (a UUID).
    pub id: SubscriberId,

    /// Channel the broker pushes deliveries into.
    pub sender: UnboundedSender<Delivery>,
}

impl Subscriber {
    pub fn new(sender: UnboundedSender<Delivery>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
        }
    }
}

/// The receiving end of a subscriber.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    receiver: UnboundedReceiver<Delivery>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, receiver: UnboundedReceiver<Delivery>) -> Self {
        Self { id, receiver }
    }

    /// Next delivery if one is already queued.
    pub fn try_next(&mut self) -> Option<Delivery> {
        self.receiver.try_recv().ok()
    }

    /// Waits for the next delivery. Returns `None` once the broker dropped
    /// the subscriber.
    pub async fn next(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }

    /// Everything queued so far.
    pub fn drain(&mut self) -> Vec<Delivery> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
