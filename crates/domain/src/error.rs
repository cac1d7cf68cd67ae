//! Unified error type for the domain layer.
//!
//! One enum per layer: adapters convert `DomainError` to a
//! transport-appropriate response rather than forcing the state machines
//! to know about terminals, HTTP, or SSH.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An input was not defined for the machine's current state.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A role power was queried before it was activated this game.
    #[error("power not yet activated")]
    PowerNotActivated,

    /// A role power was activated more than once in a single game.
    #[error("power already activated")]
    PowerAlreadyActivated,

    /// A vote, swap, or view referenced a player not in the game.
    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    /// Session id generation exhausted its collision-retry budget.
    #[error("session id space exhausted after {0} attempts")]
    SessionIdExhausted(u32),
}

impl DomainError {
    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }
}
