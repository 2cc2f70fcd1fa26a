use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("simulated controller disconnected")]
    Disconnected,
    #[error("simulated controller timeout")]
    Timeout,
    #[error("tool table index {0} unreadable")]
    ToolIndex(usize),
    #[error("tool {0} not in tool table")]
    UnknownTool(i32),
}

pub type Result<T> = std::result::Result<T, SimError>;
