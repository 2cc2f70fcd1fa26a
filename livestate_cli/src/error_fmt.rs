//! Human-readable error descriptions and structured JSON error formatting.

use livestate_core::error::{BuildError, LiveStateError};
use livestate_core::source_error::map_source_error;
use livestate_sim::SimError;

fn describe(e: &LiveStateError) -> String {
    match e {
        LiveStateError::Connection(msg) => format!(
            "What happened: Could not reach the controller ({msg}).\nLikely causes: The controller is not running or its status channel is closed.\nHow to fix: Start the controller, then rerun."
        ),
        LiveStateError::Timeout => "What happened: Timed out waiting for the controller.\nLikely causes: A command took longer than completion.timeout_ms, or the controller stopped responding.\nHow to fix: Raise completion.timeout_ms (or --timeout-ms) and check the controller.".to_string(),
        LiveStateError::Tool(msg) => format!(
            "What happened: Tool lookup failed ({msg}).\nLikely causes: The tool number is not in the tool table, or 0 (empty spindle) was requested.\nHow to fix: Check [sim].tools in the config or pick another tool number."
        ),
        LiveStateError::SourceFault(msg) => format!(
            "What happened: The controller returned an unreadable value ({msg}).\nLikely causes: A transient read failure.\nHow to fix: Re-run with --log-level=debug for details."
        ),
        LiveStateError::State(msg) => format!(
            "What happened: {msg}.\nLikely causes: The controller refused the command in its current state.\nHow to fix: Check the controller state and rerun."
        ),
    }
}

/// The typed error behind `err`, if any; simulator errors are mapped too.
fn live_state_error(err: &eyre::Report) -> Option<LiveStateError> {
    if let Some(e) = err.downcast_ref::<LiveStateError>() {
        return Some(e.clone());
    }
    err.downcast_ref::<SimError>().map(|e| map_source_error(e))
}

fn is_config_error(err: &eyre::Report) -> bool {
    err.chain()
        .any(|c| c.to_string().to_ascii_lowercase().contains("config"))
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSource => {
                "What happened: No status source was provided to the delta engine.\nLikely causes: The engine builder was not given with_source(...).\nHow to fix: Pass a snapshot source before try_build().".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(e) = live_state_error(err) {
        return describe(&e);
    }

    let msg = format!("{err:#}");
    if is_config_error(err) {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: A syntax error or an out-of-range value in the TOML.\nHow to fix: Edit the config file, then rerun."
        );
    }

    format!(
        "Something went wrong.\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 config, 3 connection, 4 timeout, 5 tool, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match live_state_error(err) {
        Some(LiveStateError::Connection(_)) => 3,
        Some(LiveStateError::Timeout) => 4,
        Some(LiveStateError::Tool(_)) => 5,
        Some(_) => 1,
        None if err.downcast_ref::<BuildError>().is_some() || is_config_error(err) => 2,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match live_state_error(err) {
        Some(LiveStateError::Connection(_)) => "Connection",
        Some(LiveStateError::Timeout) => "Timeout",
        Some(LiveStateError::Tool(_)) => "Tool",
        Some(LiveStateError::SourceFault(_)) => "SourceFault",
        Some(LiveStateError::State(_)) => "State",
        None if is_config_error(err) => "Config",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
