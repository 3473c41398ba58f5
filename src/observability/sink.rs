use tracing::{error, info, warn};

use crate::app::ports::DiagnosticSink;

/// Production sink forwarding diagnostics to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn info(&self, message: &str) {
        info!("{}", message);
    }

    fn warn(&self, message: &str) {
        warn!("{}", message);
    }

    fn exception(&self, context: &str, err: &dyn std::error::Error) {
        error!(error = %err, "{}", context);
    }
}
