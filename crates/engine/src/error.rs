//! Engine-level error aggregation. Per-subsystem errors convert into
//! `EngineError` via `#[from]`, collecting each port/transport's own
//! error type under one enum for the process's top-level handlers.

use thiserror::Error;
use txwerewolves_domain::DomainError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("session id space exhausted after {0} collisions")]
    SessionIdExhausted(u32),

    #[error("no such user: {0}")]
    UnknownUser(String),

    #[error("no such session: {0}")]
    UnknownSession(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ssh transport error: {0}")]
    Ssh(String),
}

impl From<russh::Error> for EngineError {
    fn from(e: russh::Error) -> Self {
        EngineError::Ssh(e.to_string())
    }
}

impl EngineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
