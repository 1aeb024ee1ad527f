//! Event sink for user-facing errors, messages and reports
//!
//! The configuration aggregate and the polling controller push what the
//! operator should see into one injected [`EventSink`]. Without a sink,
//! callers still receive every error as a `Result`, and scheduled passes
//! fall back to `tracing`.

use crate::error::WireError;
use std::fmt;
use tracing::{error, info};

/// Receiver for operator-facing events
pub trait EventSink: Send + Sync + fmt::Debug {
    /// An operation failed
    fn error(&self, error: &WireError);

    /// Informational message, such as a confirmation
    fn message(&self, message: &str);

    /// A compliance report was produced
    fn report(&self, report: &str) {
        self.message(report);
    }
}

/// Sink that forwards everything to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn error(&self, err: &WireError) {
        error!(error = %err, user_error = err.is_user_error(), "Operation failed");
    }

    fn message(&self, message: &str) {
        info!("{}", message);
    }

    fn report(&self, report: &str) {
        info!(lines = report.lines().count(), "Compliance report produced");
    }
}
