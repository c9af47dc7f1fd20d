use std::collections::HashSet;
use std::fmt;

use crate::client::SubscriberId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    Topic,
    Direct,
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeKind::Topic => f.write_str("topic"),
            ExchangeKind::Direct => f.write_str("direct"),
        }
    }
}

/// A subscriber's interest in an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub subscriber: SubscriberId,
    pub pattern: String,
}

/// Represents an exchange in the broker.
///
/// Holds the bindings of its subscribers and decides, per routing key,
/// which of them receive a delivery.
#[derive(Debug)]
pub struct Exchange {
    pub name: String,
    pub kind: ExchangeKind,
    pub bindings: Vec<Binding>,
}

impl Exchange {
    pub fn new(name: &str, kind: ExchangeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            bindings: Vec::new(),
        }
    }

    /// Binds a subscriber with the given pattern. Binding the same pair twice
    /// has no effect.
    pub fn bind(&mut self, subscriber: SubscriberId, pattern: &str) {
        let binding = Binding {
            subscriber,
            pattern: pattern.to_string(),
        };
        if !self.bindings.contains(&binding) {
            self.bindings.push(binding);
        }
    }

    /// Removes every binding of the subscriber.
    pub fn unbind(&mut self, subscriber: &SubscriberId) {
        self.bindings.retain(|b| &b.subscriber != subscriber);
    }

    /// Subscribers that should receive a message with `routing_key`, each at
    /// most once even when several of their bindings match.
    pub fn route(&self, routing_key: &str) -> Vec<SubscriberId> {
        let mut seen = HashSet::new();
        self.bindings
            .iter()
            .filter(|b| match self.kind {
                ExchangeKind::Topic => topic_matches(&b.pattern, routing_key),
                ExchangeKind::Direct => b.pattern == routing_key,
            })
            .filter(|b| seen.insert(b.subscriber.clone()))
            .map(|b| b.subscriber.clone())
            .collect()
    }
}

/// AMQP topic matching: words are separated by `.`, `*` matches exactly one
/// word and `#` matches zero or more words.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((&word, rest)) => match key.split_first() {
            Some((&k, key_rest)) => (word == "*" || word == k) && match_words(rest, key_rest),
            None => false,
        },
    }
}
