use serde::Serialize;

/// A message as seen by a subscriber of the in-memory broker.
///
/// - `exchange` - The exchange the message was published to.
/// - `routing_key` - The routing key it was published with.
/// - `body` - The raw bytes the publisher sent.
/// - `delivered_at` - Milliseconds since the UNIX epoch, set by the broker on routing.
#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub exchange: String,
    pub routing_key: String,
    pub body: Vec<u8>,
    pub delivered_at: i64,
}

impl Delivery {
    /// Decodes the body as JSON.
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.body)
    }
}
