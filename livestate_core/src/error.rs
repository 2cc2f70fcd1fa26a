use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LiveStateError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("source fault: {0}")]
    SourceFault(String),
    #[error("timeout waiting for controller")]
    Timeout,
    #[error("invalid state: {0}")]
    State(String),
    #[error("tool lookup failed: {0}")]
    Tool(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing snapshot source")]
    MissingSource,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
