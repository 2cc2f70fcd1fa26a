//! Maps `Box<dyn Error>` from trait boundaries to typed `LiveStateError`.
//!
//! The source traits use `Box<dyn Error + Send + Sync>` so any transport can
//! plug in; this module converts those to our typed error enum, with an
//! optional feature-gated path for `livestate_sim::SimError` downcasting.

use crate::error::LiveStateError;

/// Map a trait-boundary error to a typed `LiveStateError`.
///
/// Attempts to downcast known simulator error types first, then falls back
/// to string-based heuristics.
pub fn map_source_error(e: &(dyn std::error::Error + 'static)) -> LiveStateError {
    #[cfg(feature = "sim-errors")]
    {
        use livestate_sim::SimError;
        if let Some(sim) = e.downcast_ref::<SimError>() {
            return match sim {
                SimError::Disconnected => LiveStateError::Connection(sim.to_string()),
                SimError::Timeout => LiveStateError::Timeout,
                SimError::UnknownTool(_) => LiveStateError::Tool(sim.to_string()),
                SimError::ToolIndex(_) => LiveStateError::SourceFault(sim.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        LiveStateError::Timeout
    } else {
        LiveStateError::SourceFault(s)
    }
}

/// A failed fetch or connect means the controller is unreachable, whatever the
/// underlying cause; the cause is kept in the message.
pub fn connection_failure(e: &(dyn std::error::Error + 'static)) -> LiveStateError {
    match map_source_error(e) {
        LiveStateError::Connection(msg) | LiveStateError::SourceFault(msg) => {
            LiveStateError::Connection(msg)
        }
        other => LiveStateError::Connection(other.to_string()),
    }
}
