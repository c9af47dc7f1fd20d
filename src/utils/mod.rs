//! Shared utilities: the error taxonomy surfaced by the publisher and the
//! tracing setup used by the binary and tests.

pub mod error;
pub mod logging;
