//! The `client` module defines the subscriber side of the in-memory broker.
//!
//! A [`Subscriber`] is the broker's handle on a consumer (its id and the
//! sending half of a channel); a [`Subscription`] is what the consumer keeps
//! to read deliveries.

pub mod subscriber;
pub use subscriber::{Subscriber, SubscriberId, Subscription};
