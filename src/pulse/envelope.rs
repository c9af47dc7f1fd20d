//! The envelope every Pulse message travels in:
//!
//! ```json
//! {"payload": {...}, "_meta": {"exchange": "...", "routing_key": "...",
//!  "serializer": "json", "sent": "2024-05-01T12:00:00.123456"}}
//! ```
//!
//! `sent` is naive UTC with microsecond precision, the format existing Pulse
//! consumers parse.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::error::PublishError;

pub const SERIALIZER: &str = "json";
pub const SENT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub payload: Value,
    #[serde(rename = "_meta")]
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub exchange: String,
    pub routing_key: String,
    pub serializer: String,
    pub sent: String,
}

impl Envelope {
    pub fn new(payload: Value, exchange: &str, routing_key: &str, sent: DateTime<Utc>) -> Self {
        Self {
            payload,
            meta: Meta {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                serializer: SERIALIZER.to_string(),
                sent: sent.format(SENT_FORMAT).to_string(),
            },
        }
    }

    /// `_meta.sent` read back as UTC.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.meta.sent, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, PublishError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Exchange names: ASCII letters, digits and `-_.:/`, at most 255 bytes.
/// The `amq.` prefix is reserved by the broker.
pub fn validate_exchange_name(name: &str) -> Result<(), PublishError> {
    let invalid = |reason| {
        Err(PublishError::InvalidExchange {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("must not be empty");
    }
    if name.len() > MAX_NAME_LEN {
        return invalid("longer than 255 bytes");
    }
    if name.starts_with("amq.") {
        return invalid("the amq. prefix is reserved");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '/'))
    {
        return invalid("only letters, digits and -_.:/ are allowed");
    }
    Ok(())
}

pub fn validate_routing_key(key: &str) -> Result<(), PublishError> {
    let invalid = |reason| {
        Err(PublishError::InvalidRoutingKey {
            key: key.to_string(),
            reason,
        })
    };

    if key.is_empty() {
        return invalid("must not be empty");
    }
    if key.len() > MAX_NAME_LEN {
        return invalid("longer than 255 bytes");
    }
    Ok(())
}
