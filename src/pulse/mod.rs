//! Pulse publisher: connection manager, publisher, liveness probe and the
//! tree status notifier built on top of them.

pub mod connection;
pub mod envelope;
pub mod heartbeat;
pub mod notify;
pub mod publisher;

pub use connection::{Connection, ConnectionConfig, ConnectionState};
pub use envelope::Envelope;
pub use heartbeat::app_heartbeat;
pub use notify::{TreeStatusChange, TreeStatusNotifier};
pub use publisher::Pulse;
