//! Glue between the liveness probe and an external health-check endpoint.

use tracing::error;

use crate::pulse::publisher::Pulse;
use crate::utils::error::HeartbeatError;

/// Probes the broker for a health check.
///
/// A failure is logged with its transport cause and returned as the single
/// `HeartbeatError` kind, which the endpoint turns into a service-degraded
/// response.
pub async fn app_heartbeat(pulse: &Pulse) -> Result<(), HeartbeatError> {
    pulse.ping().await.inspect_err(|e| {
        error!(cause = %e.cause(), "{e}");
    })
}
